//! Service traits for storage and external collaborators
//!
//! The engine only talks to these traits; in-memory implementations live in
//! [`crate::storage`]. Every method returns a [`DispatchResult`] so backend
//! failures surface as [`StorageError`](crate::core::error::StorageError)
//! instead of panics.

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::{DependencyError, DispatchResult};
use crate::core::query::DateRange;
use crate::entities::{
    CatalogEntry, CatalogKind, CatalogPatch, Contractor, LifecycleEntry, Notification, WorkOrder,
    WorkOrderPatch, WorkOrderStatus,
};

/// Storage of catalog reference data (types and areas)
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert(&self, entry: CatalogEntry) -> DispatchResult<CatalogEntry>;

    async fn get(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<Option<CatalogEntry>>;

    /// Entries of one kind in creation order
    async fn list(&self, kind: CatalogKind) -> DispatchResult<Vec<CatalogEntry>>;

    /// Fails with `NotFound` if `id` is absent
    async fn update(
        &self,
        kind: CatalogKind,
        id: &Uuid,
        patch: CatalogPatch,
    ) -> DispatchResult<CatalogEntry>;

    /// Hard delete; fails with `NotFound` if `id` is absent
    async fn delete(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<CatalogEntry>;
}

/// The single source of truth for work orders
#[async_trait]
pub trait WorkOrderRepository: Send + Sync {
    /// Store a new work order; its id must not be in use
    async fn insert(&self, work_order: WorkOrder) -> DispatchResult<WorkOrder>;

    async fn get(&self, id: &str) -> DispatchResult<Option<WorkOrder>>;

    async fn contains(&self, id: &str) -> DispatchResult<bool>;

    /// All work orders in creation order
    async fn list(&self) -> DispatchResult<Vec<WorkOrder>>;

    /// Children of `parent_id` in creation order
    async fn list_children(&self, parent_id: &str) -> DispatchResult<Vec<WorkOrder>>;

    /// Give unmapped work orders a parent, all of them or none
    ///
    /// Fails without changing anything if an id is unknown or already has a
    /// parent. History is not touched since no status changes.
    async fn attach_children(
        &self,
        parent_id: &str,
        child_ids: &[String],
    ) -> DispatchResult<Vec<WorkOrder>>;

    /// Patch the mutable fields; `InvalidState` once the work order is closed
    async fn update(&self, id: &str, patch: WorkOrderPatch) -> DispatchResult<WorkOrder>;

    /// Compare-and-set keyed on the current status
    ///
    /// Replaces the stored record with `updated` and appends `entry` to its
    /// history as one step, but only if the stored status is still `expected`.
    /// Otherwise nothing changes and `InvalidState` is returned.
    async fn replace_if_status(
        &self,
        expected: WorkOrderStatus,
        updated: WorkOrder,
        entry: LifecycleEntry,
    ) -> DispatchResult<WorkOrder>;

    /// Committed transitions of a work order, oldest first
    async fn history(&self, id: &str) -> DispatchResult<Vec<LifecycleEntry>>;

    /// Work orders whose id equals or contains `query`
    ///
    /// Exact matches first, then the rest in creation order.
    async fn search(&self, query: &str) -> DispatchResult<Vec<WorkOrder>>;

    /// Work orders created within `range`, optionally with its status
    async fn filter(&self, range: &DateRange) -> DispatchResult<Vec<WorkOrder>>;
}

/// Where contractors and their negotiated prices come from
#[async_trait]
pub trait ContractorDirectory: Send + Sync {
    async fn get(&self, contractor_id: &str) -> DispatchResult<Option<Contractor>>;

    /// All contractors, active or not, in a stable order
    async fn list(&self) -> DispatchResult<Vec<Contractor>>;

    /// Client and area specific price, if one was negotiated
    async fn standard_rate(
        &self,
        contractor_id: &str,
        client: &str,
        area: &str,
    ) -> DispatchResult<Option<f64>>;
}

/// Outbound delivery (email, webhook, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DependencyError>;
}

/// Opaque storage for image attachments
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a reference that can be put on a work order
    async fn put(
        &self,
        work_order_id: &str,
        kind: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DependencyError>;

    async fn get(&self, reference: &str) -> Result<Option<Vec<u8>>, DependencyError>;
}
