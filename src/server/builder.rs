//! DispatchServerBuilder for fluent construction of the dispatch HTTP server

use super::host::DispatchHost;
use super::router::build_routes;
use crate::config::DispatchConfig;
use crate::core::events::EventBus;
use crate::core::service::{
    BlobStore, CatalogStore, ContractorDirectory, Notifier, WorkOrderRepository,
};
use crate::dispatch::{
    CatalogService, ContractorMatcher, LifecycleEngine, LogNotifier, NotificationDispatcher,
};
use crate::storage::{
    InMemoryBlobStore, InMemoryCatalogStore, InMemoryContractorDirectory,
    InMemoryWorkOrderRepository,
};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the dispatch server
///
/// Every backend defaults to its in-memory implementation; the contractor
/// directory is seeded from `contractors` / `standard_rates` in the config.
///
/// # Example
///
/// ```ignore
/// let config = DispatchConfig::from_yaml_file("dispatch.yaml")?;
/// let bind = config.server.bind.clone();
/// DispatchServerBuilder::new()
///     .with_config(config)
///     .serve(&bind)
///     .await?;
/// ```
pub struct DispatchServerBuilder {
    config: DispatchConfig,
    repository: Option<Arc<dyn WorkOrderRepository>>,
    catalog_store: Option<Arc<dyn CatalogStore>>,
    contractors: Option<Arc<dyn ContractorDirectory>>,
    notifier: Option<Arc<dyn Notifier>>,
    blobs: Option<Arc<dyn BlobStore>>,
    custom_routes: Vec<Router>,
    event_bus: Option<EventBus>,
}

impl DispatchServerBuilder {
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
            repository: None,
            catalog_store: None,
            contractors: None,
            notifier: None,
            blobs: None,
            custom_routes: Vec::new(),
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_repository(mut self, repository: impl WorkOrderRepository + 'static) -> Self {
        self.repository = Some(Arc::new(repository));
        self
    }

    pub fn with_catalog_store(mut self, store: impl CatalogStore + 'static) -> Self {
        self.catalog_store = Some(Arc::new(store));
        self
    }

    /// Replace the config-seeded contractor directory
    pub fn with_contractor_directory(
        mut self,
        directory: impl ContractorDirectory + 'static,
    ) -> Self {
        self.contractors = Some(Arc::new(directory));
        self
    }

    /// Set the notification channel
    ///
    /// Without one, the webhook notifier is used when `push` is enabled and
    /// `notification.webhook_url` is set; otherwise notifications are only logged.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn with_blob_store(mut self, blobs: impl BlobStore + 'static) -> Self {
        self.blobs = Some(Arc::new(blobs));
        self
    }

    /// Add routes next to the dispatch API, e.g. an operator UI or webhooks
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Size the event bus; lagging subscribers lose the oldest events
    pub fn with_event_bus(mut self, capacity: usize) -> Self {
        self.event_bus = Some(EventBus::new(capacity));
        self
    }

    fn default_notifier(config: &DispatchConfig) -> Arc<dyn Notifier> {
        #[cfg(feature = "push")]
        if let Some(url) = &config.notification.webhook_url {
            tracing::info!(url = %url, "notifications go to webhook");
            return Arc::new(crate::dispatch::WebhookNotifier::new(url.clone()));
        }

        if config.notification.webhook_url.is_some() {
            tracing::warn!("notification.webhook_url set but the push feature is disabled");
        }
        Arc::new(LogNotifier)
    }

    /// Build the host with all services wired together
    pub fn build_host(self) -> Result<(DispatchHost, Vec<Router>)> {
        self.config.validate()?;

        let events = self.event_bus.unwrap_or_default();
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryWorkOrderRepository::new()));
        let catalog_store = self
            .catalog_store
            .unwrap_or_else(|| Arc::new(InMemoryCatalogStore::new()));
        let contractors = self.contractors.unwrap_or_else(|| {
            Arc::new(InMemoryContractorDirectory::new(
                self.config.contractors.clone(),
                self.config.standard_rates.clone(),
            ))
        });
        let notifier = self
            .notifier
            .unwrap_or_else(|| Self::default_notifier(&self.config));
        let blobs = self
            .blobs
            .unwrap_or_else(|| Arc::new(InMemoryBlobStore::new()));

        let notifications = NotificationDispatcher::new(notifier, &self.config.notification)?;
        let engine = LifecycleEngine::new(
            repository,
            CatalogService::new(catalog_store, events.clone()),
            ContractorMatcher::new(contractors),
            notifications,
            events,
            self.config.assignment.clone(),
        )
        .with_strict_catalog(self.config.catalog.strict);

        tracing::debug!(
            contractors = self.config.contractors.len(),
            strict_catalog = self.config.catalog.strict,
            "dispatch host built"
        );

        Ok((
            DispatchHost::new(Arc::new(engine), blobs, self.config),
            self.custom_routes,
        ))
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let (host, custom_routes) = self.build_host()?;
        let mut app = build_routes(Arc::new(host));
        for routes in custom_routes {
            app = app.merge(routes);
        }
        Ok(app)
    }

    /// Serve the application with graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        serve_router(self.build()?, addr).await
    }
}

/// Serve an already built router with graceful shutdown
pub async fn serve_router(app: Router, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

impl Default for DispatchServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Contractor;

    #[test]
    fn test_build_with_defaults() {
        assert!(DispatchServerBuilder::new().build().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DispatchConfig::default();
        config.notification.timeout_ms = 0;
        let err = DispatchServerBuilder::new()
            .with_config(config)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[tokio::test]
    async fn test_contractors_seeded_from_config() {
        let mut config = DispatchConfig::default();
        config.contractors.push(Contractor {
            id: "c-1".to_string(),
            name: "Acme".to_string(),
            email: "acme@example.com".to_string(),
            rate: 100.0,
            service_locations: "north".to_string(),
            active: true,
        });
        let (host, _) = DispatchServerBuilder::new()
            .with_config(config)
            .build_host()
            .unwrap();
        let found = host.engine().matcher().find_by_area("North").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].contractor_id, "c-1");
    }

    #[test]
    fn test_custom_routes_are_returned() {
        let (_, routes) = DispatchServerBuilder::new()
            .with_custom_routes(Router::new())
            .with_event_bus(8)
            .build_host()
            .unwrap();
        assert_eq!(routes.len(), 1);
    }
}
