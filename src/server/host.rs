//! Server host for the dispatch API
//!
//! `DispatchHost` holds everything the HTTP handlers need: the lifecycle
//! engine (which owns catalog, matcher, search and notifications), the blob
//! store for image uploads, the loaded configuration and the event bus.
//! It is transport-agnostic; the router only borrows it through an `Arc`.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::core::events::EventBus;
use crate::core::service::BlobStore;
use crate::dispatch::LifecycleEngine;

/// Shared state behind every route
pub struct DispatchHost {
    pub engine: Arc<LifecycleEngine>,

    /// Storage for opening / closing images
    pub blobs: Arc<dyn BlobStore>,

    pub config: Arc<DispatchConfig>,

    /// Bus the engine publishes lifecycle and catalog events on
    pub event_bus: EventBus,
}

impl DispatchHost {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        blobs: Arc<dyn BlobStore>,
        config: DispatchConfig,
    ) -> Self {
        let event_bus = engine.events().clone();
        Self {
            engine,
            blobs,
            config: Arc::new(config),
            event_bus,
        }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
