//! Core types shared by every layer: errors, events, queries, service traits
//! and payload validation

pub mod error;
pub mod events;
pub mod query;
pub mod service;
pub mod validation;

pub use error::{DispatchError, DispatchResult};
pub use events::{DispatchEvent, EventBus, EventEnvelope};
pub use query::{DateRange, FilterQuery};
pub use service::{BlobStore, CatalogStore, ContractorDirectory, Notifier, WorkOrderRepository};
