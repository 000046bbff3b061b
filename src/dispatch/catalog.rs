//! Catalog operations: create, update, delete and list types and areas

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{DispatchResult, EntityError};
use crate::core::events::{CatalogAction, DispatchEvent, EventBus};
use crate::core::service::CatalogStore;
use crate::entities::{CatalogEntry, CatalogKind, CatalogPatch, NewCatalogEntry};

/// Catalog operations on top of a [`CatalogStore`]
///
/// Names are not required to be unique and deleting an entry does not touch
/// work orders that already use its name.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    events: EventBus,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    fn changed(&self, entry: &CatalogEntry, action: CatalogAction) {
        self.events.publish(DispatchEvent::CatalogChanged {
            catalog: entry.kind,
            entry_id: entry.id,
            action,
        });
    }

    pub async fn create(&self, kind: CatalogKind, new: NewCatalogEntry) -> DispatchResult<CatalogEntry> {
        new.validate()?;
        let entry = self
            .store
            .insert(CatalogEntry::new(kind, new.name, new.status))
            .await?;
        debug!(kind = %kind, id = %entry.id, name = %entry.name, "catalog entry created");
        self.changed(&entry, CatalogAction::Created);
        Ok(entry)
    }

    pub async fn get(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<CatalogEntry> {
        self.store.get(kind, id).await?.ok_or_else(|| {
            EntityError::NotFound {
                entity_type: kind.as_str().to_string(),
                id: id.to_string(),
            }
            .into()
        })
    }

    pub async fn update(
        &self,
        kind: CatalogKind,
        id: &Uuid,
        patch: CatalogPatch,
    ) -> DispatchResult<CatalogEntry> {
        patch.validate()?;
        let entry = self.store.update(kind, id, patch).await?;
        debug!(kind = %kind, id = %entry.id, "catalog entry updated");
        self.changed(&entry, CatalogAction::Updated);
        Ok(entry)
    }

    /// Hard delete; the caller confirms destructive intent beforehand
    pub async fn delete(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<CatalogEntry> {
        let entry = self.store.delete(kind, id).await?;
        debug!(kind = %kind, id = %entry.id, "catalog entry deleted");
        self.changed(&entry, CatalogAction::Deleted);
        Ok(entry)
    }

    pub async fn list(&self, kind: CatalogKind) -> DispatchResult<Vec<CatalogEntry>> {
        self.store.list(kind).await
    }

    /// Only `Active` entries, what creation screens offer
    pub async fn list_active(&self, kind: CatalogKind) -> DispatchResult<Vec<CatalogEntry>> {
        let mut entries = self.store.list(kind).await?;
        entries.retain(|e| e.status.is_active());
        Ok(entries)
    }

    /// Whether an active entry named `name` exists (case-insensitive)
    pub async fn is_active_name(&self, kind: CatalogKind, name: &str) -> DispatchResult<bool> {
        Ok(self
            .list_active(kind)
            .await?
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(name.trim())))
    }
}
