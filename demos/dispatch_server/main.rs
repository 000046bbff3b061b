//! Dispatch server with config-seeded contractors
//!
//! Run with:
//!
//! ```text
//! RUST_LOG=debug cargo run --example dispatch_server -- demos/dispatch.yaml
//! ```
//!
//! Then try:
//! - `curl -X POST localhost:3000/types -H 'content-type: application/json' -d '{"name":"cleaning"}'`
//! - `curl 'localhost:3000/work-orders/generate-id?type=cleaning'`
//! - `curl localhost:3000/contractors/by-area/north`

use dispatch::prelude::*;
use dispatch::server::{build_routes, serve_router};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/dispatch.yaml".to_string());
    let config = DispatchConfig::from_yaml_file(&path)?;
    tracing::info!(
        config = %path,
        contractors = config.contractors.len(),
        "configuration loaded"
    );

    let bind = config.server.bind.clone();
    let (host, _) = DispatchServerBuilder::new()
        .with_config(config)
        .with_event_bus(256)
        .build_host()?;

    let mut events = host.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            tracing::info!(
                kind = envelope.event.event_kind(),
                work_order_id = envelope.event.work_order_id().unwrap_or("-"),
                "event"
            );
        }
    });

    let app = build_routes(Arc::new(host));
    serve_router(app, &bind).await
}
