//! In-memory storage backends

pub mod blobs;
pub mod contractors;
pub mod in_memory;

pub use blobs::InMemoryBlobStore;
pub use contractors::InMemoryContractorDirectory;
pub use in_memory::{InMemoryCatalogStore, InMemoryWorkOrderRepository};
