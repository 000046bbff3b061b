//! # Work Order Dispatch
//!
//! Lifecycle and dispatch engine for service work orders.
//!
//! ## Features
//!
//! - **Catalog**: work order types and areas with an Active / Inactive status
//! - **Rates**: total and per-type breakdown composed from the selected types
//! - **Lifecycle**: OPEN → ASSIGNED → ACCEPTED → IN_PROGRESS → CLOSED, with
//!   rejection, reopening and parent / child closing constraints
//! - **Assignment**: manual or automatic contractor matching by area, with
//!   best-effort acceptance requests and expiring response links
//! - **HTTP API**: axum routes over the whole engine
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dispatch::prelude::*;
//!
//! let config = DispatchConfig::from_yaml_file("dispatch.yaml")?;
//! let bind = config.server.bind.clone();
//! DispatchServerBuilder::new()
//!     .with_config(config)
//!     .serve(&bind)
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{DispatchError, DispatchResult},
        events::{DispatchEvent, EventBus, EventEnvelope},
        query::{DateRange, FilterQuery},
        service::{BlobStore, CatalogStore, ContractorDirectory, Notifier, WorkOrderRepository},
        validation::Validated,
    };

    // === Entities ===
    pub use crate::entities::{
        AssignmentAttempt, AssignmentType, AutomationStatus, CatalogEntry, CatalogKind, CatalogStatus, Contractor,
        ContractorAssignment, LifecycleEntry, NewWorkOrder, Rate, Transition, WorkOrder,
        WorkOrderPatch, WorkOrderStatus,
    };

    // === Engine ===
    pub use crate::dispatch::{
        AssignmentOutcome, CatalogService, ContractorMatcher, ContractorResponse, Decision,
        LifecycleEngine, LogNotifier, NotificationDispatcher,
    };

    // === Storage ===
    pub use crate::storage::{
        InMemoryBlobStore, InMemoryCatalogStore, InMemoryContractorDirectory,
        InMemoryWorkOrderRepository,
    };

    // === Config ===
    pub use crate::config::DispatchConfig;

    // === Server ===
    pub use crate::server::{DispatchHost, DispatchServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
