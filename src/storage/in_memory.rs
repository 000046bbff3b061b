//! In-memory catalog store and work order repository
//!
//! Both use `Arc<RwLock<..>>` over an `IndexMap` so iteration follows
//! insertion (creation) order. Poisoned locks surface as
//! [`StorageError::LockPoisoned`].

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{
    DispatchError, DispatchResult, EntityError, LifecycleError, StorageError,
};
use crate::core::query::DateRange;
use crate::core::service::{CatalogStore, WorkOrderRepository};
use crate::entities::{
    CatalogEntry, CatalogKind, CatalogPatch, LifecycleEntry, WorkOrder, WorkOrderPatch,
    WorkOrderStatus,
};

fn catalog_not_found(kind: CatalogKind, id: &Uuid) -> DispatchError {
    EntityError::NotFound {
        entity_type: kind.as_str().to_string(),
        id: id.to_string(),
    }
    .into()
}

/// In-memory catalog store
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    entries: Arc<RwLock<IndexMap<Uuid, CatalogEntry>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert(&self, entry: CatalogEntry) -> DispatchResult<CatalogEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::poisoned("catalog"))?;

        if entries
            .values()
            .any(|e| e.kind == entry.kind && e.name.eq_ignore_ascii_case(&entry.name))
        {
            debug!(kind = %entry.kind, name = %entry.name, "duplicate catalog name");
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<Option<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::poisoned("catalog"))?;
        Ok(entries.get(id).filter(|e| e.kind == kind).cloned())
    }

    async fn list(&self, kind: CatalogKind) -> DispatchResult<Vec<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::poisoned("catalog"))?;
        Ok(entries.values().filter(|e| e.kind == kind).cloned().collect())
    }

    async fn update(
        &self,
        kind: CatalogKind,
        id: &Uuid,
        patch: CatalogPatch,
    ) -> DispatchResult<CatalogEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::poisoned("catalog"))?;

        let entry = entries
            .get_mut(id)
            .filter(|e| e.kind == kind)
            .ok_or_else(|| catalog_not_found(kind, id))?;
        patch.apply(entry);
        Ok(entry.clone())
    }

    async fn delete(&self, kind: CatalogKind, id: &Uuid) -> DispatchResult<CatalogEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::poisoned("catalog"))?;

        if !entries.get(id).is_some_and(|e| e.kind == kind) {
            return Err(catalog_not_found(kind, id));
        }
        // shift_remove keeps the remaining entries in creation order
        entries
            .shift_remove(id)
            .ok_or_else(|| catalog_not_found(kind, id))
    }
}

#[derive(Default)]
struct WorkOrderTable {
    records: IndexMap<String, WorkOrder>,
    history: HashMap<String, Vec<LifecycleEntry>>,
}

/// In-memory work order repository
#[derive(Clone, Default)]
pub struct InMemoryWorkOrderRepository {
    table: Arc<RwLock<WorkOrderTable>>,
}

impl InMemoryWorkOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkOrderRepository for InMemoryWorkOrderRepository {
    async fn insert(&self, work_order: WorkOrder) -> DispatchResult<WorkOrder> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::poisoned("work order"))?;

        if table.records.contains_key(&work_order.id) {
            return Err(DispatchError::field(
                "id",
                format!("work order id '{}' is already in use", work_order.id),
            ));
        }
        table.history.insert(work_order.id.clone(), Vec::new());
        table
            .records
            .insert(work_order.id.clone(), work_order.clone());
        Ok(work_order)
    }

    async fn get(&self, id: &str) -> DispatchResult<Option<WorkOrder>> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        Ok(table.records.get(id).cloned())
    }

    async fn contains(&self, id: &str) -> DispatchResult<bool> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        Ok(table.records.contains_key(id))
    }

    async fn list(&self) -> DispatchResult<Vec<WorkOrder>> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        Ok(table.records.values().cloned().collect())
    }

    async fn list_children(&self, parent_id: &str) -> DispatchResult<Vec<WorkOrder>> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        Ok(table
            .records
            .values()
            .filter(|wo| wo.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn attach_children(
        &self,
        parent_id: &str,
        child_ids: &[String],
    ) -> DispatchResult<Vec<WorkOrder>> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::poisoned("work order"))?;

        if !table.records.contains_key(parent_id) {
            return Err(DispatchError::work_order_not_found(parent_id));
        }
        for id in child_ids {
            let child = table
                .records
                .get(id)
                .ok_or_else(|| DispatchError::work_order_not_found(id))?;
            if let Some(existing) = &child.parent_id {
                return Err(LifecycleError::PreconditionFailed {
                    id: parent_id.to_string(),
                    reason: "work order already has a parent".to_string(),
                    blocking: vec![format!("{} (mapped to {})", id, existing)],
                }
                .into());
            }
        }

        let mut attached = Vec::with_capacity(child_ids.len());
        for id in child_ids {
            if let Some(child) = table.records.get_mut(id) {
                child.parent_id = Some(parent_id.to_string());
                attached.push(child.clone());
            }
        }
        debug!(parent_id, count = attached.len(), "children attached");
        Ok(attached)
    }

    async fn update(&self, id: &str, patch: WorkOrderPatch) -> DispatchResult<WorkOrder> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::poisoned("work order"))?;

        let work_order = table
            .records
            .get_mut(id)
            .ok_or_else(|| DispatchError::work_order_not_found(id))?;
        if work_order.status.is_terminal() {
            return Err(LifecycleError::InvalidState {
                id: id.to_string(),
                status: work_order.status,
                operation: "update".to_string(),
            }
            .into());
        }
        patch.apply(work_order);
        Ok(work_order.clone())
    }

    async fn replace_if_status(
        &self,
        expected: WorkOrderStatus,
        updated: WorkOrder,
        entry: LifecycleEntry,
    ) -> DispatchResult<WorkOrder> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::poisoned("work order"))?;

        let current = table
            .records
            .get_mut(&updated.id)
            .ok_or_else(|| DispatchError::work_order_not_found(&updated.id))?;
        if current.status != expected {
            return Err(LifecycleError::InvalidState {
                id: updated.id.clone(),
                status: current.status,
                operation: entry.transition.to_string(),
            }
            .into());
        }
        if current.id != updated.id
            || current.parent_id != updated.parent_id
            || current.created_at != updated.created_at
        {
            return Err(StorageError::IntegrityError {
                message: format!("identity fields of '{}' cannot change", updated.id),
            }
            .into());
        }

        *current = updated.clone();
        table
            .history
            .entry(updated.id.clone())
            .or_default()
            .push(entry);
        Ok(updated)
    }

    async fn history(&self, id: &str) -> DispatchResult<Vec<LifecycleEntry>> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        if !table.records.contains_key(id) {
            return Err(DispatchError::work_order_not_found(id));
        }
        Ok(table.history.get(id).cloned().unwrap_or_default())
    }

    async fn search(&self, query: &str) -> DispatchResult<Vec<WorkOrder>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;

        let needle = query.to_ascii_uppercase();
        let (mut exact, partial): (Vec<WorkOrder>, Vec<WorkOrder>) = table
            .records
            .values()
            .filter(|wo| wo.id.to_ascii_uppercase().contains(&needle))
            .cloned()
            .partition(|wo| wo.id.eq_ignore_ascii_case(query));
        exact.extend(partial);
        Ok(exact)
    }

    async fn filter(&self, range: &DateRange) -> DispatchResult<Vec<WorkOrder>> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::poisoned("work order"))?;
        let matches: Vec<WorkOrder> = table
            .records
            .values()
            .filter(|wo| range.contains(wo.created_at))
            .filter(|wo| range.status.is_none_or(|status| wo.status == status))
            .cloned()
            .collect();
        debug!(count = matches.len(), "filtered work orders");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AssignmentType, CatalogStatus, Rate, Transition};
    use chrono::{TimeZone, Utc};

    fn work_order(id: &str, parent: Option<&str>) -> WorkOrder {
        WorkOrder {
            id: id.to_string(),
            types: vec!["cleaning".to_string()],
            area: "north".to_string(),
            client: "Mall One".to_string(),
            status: WorkOrderStatus::Open,
            rate: Rate::default(),
            requested_closing_time: Utc::now(),
            remarks: "lobby".to_string(),
            assignment_type: AssignmentType::Manual,
            contractor: None,
            parent_id: parent.map(String::from),
            opening_images: Vec::new(),
            closing_images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_catalog_crud() {
        let store = InMemoryCatalogStore::new();
        let entry = store
            .insert(CatalogEntry::new(CatalogKind::Type, "ac", CatalogStatus::Active))
            .await
            .unwrap();

        // a type id is not an area id
        assert!(store.get(CatalogKind::Area, &entry.id).await.unwrap().is_none());

        let updated = store
            .update(
                CatalogKind::Type,
                &entry.id,
                CatalogPatch {
                    name: Some("air conditioning".to_string()),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "air conditioning");

        store.delete(CatalogKind::Type, &entry.id).await.unwrap();
        let err = store.delete(CatalogKind::Type, &entry.id).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_catalog_allows_duplicate_names() {
        let store = InMemoryCatalogStore::new();
        for _ in 0..2 {
            store
                .insert(CatalogEntry::new(CatalogKind::Area, "north", CatalogStatus::Active))
                .await
                .unwrap();
        }
        assert_eq!(store.list(CatalogKind::Area).await.unwrap().len(), 2);
        assert!(store.list(CatalogKind::Type).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let repo = InMemoryWorkOrderRepository::new();
        repo.insert(work_order("15012024P000001", None)).await.unwrap();
        let err = repo
            .insert(work_order("15012024P000001", None))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_children_in_creation_order() {
        let repo = InMemoryWorkOrderRepository::new();
        repo.insert(work_order("15012024P000001", None)).await.unwrap();
        repo.insert(work_order("15012024W000003", Some("15012024P000001")))
            .await
            .unwrap();
        repo.insert(work_order("15012024W000002", Some("15012024P000001")))
            .await
            .unwrap();

        let ids: Vec<_> = repo
            .list_children("15012024P000001")
            .await
            .unwrap()
            .into_iter()
            .map(|wo| wo.id)
            .collect();
        assert_eq!(ids, vec!["15012024W000003", "15012024W000002"]);
    }

    #[tokio::test]
    async fn test_attach_children_is_all_or_nothing() {
        let repo = InMemoryWorkOrderRepository::new();
        repo.insert(work_order("15012024P000001", None)).await.unwrap();
        repo.insert(work_order("15012024P000009", None)).await.unwrap();
        repo.insert(work_order("15012024W000002", None)).await.unwrap();
        repo.insert(work_order("15012024W000003", Some("15012024P000009")))
            .await
            .unwrap();

        let err = repo
            .attach_children(
                "15012024P000001",
                &["15012024W000002".to_string(), "15012024W000003".to_string()],
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PRECONDITION_FAILED");
        assert!(repo.get("15012024W000002").await.unwrap().unwrap().is_root());

        let attached = repo
            .attach_children("15012024P000001", &["15012024W000002".to_string()])
            .await
            .unwrap();
        assert_eq!(attached[0].parent_id.as_deref(), Some("15012024P000001"));
        assert_eq!(repo.list_children("15012024P000001").await.unwrap().len(), 1);
        assert!(repo.history("15012024W000002").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_if_status_is_compare_and_set() {
        let repo = InMemoryWorkOrderRepository::new();
        let wo = repo.insert(work_order("15012024P000001", None)).await.unwrap();

        let mut closed = wo.clone();
        closed.status = WorkOrderStatus::Closed;
        let entry = LifecycleEntry::new(
            Transition::Close,
            WorkOrderStatus::Open,
            WorkOrderStatus::Closed,
        );
        repo.replace_if_status(WorkOrderStatus::Open, closed.clone(), entry.clone())
            .await
            .unwrap();

        // second writer saw OPEN too, but the stored status moved on
        let err = repo
            .replace_if_status(WorkOrderStatus::Open, closed, entry)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
        assert_eq!(repo.history(&wo.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_closed_is_invalid_state() {
        let repo = InMemoryWorkOrderRepository::new();
        let mut wo = work_order("15012024P000001", None);
        wo.status = WorkOrderStatus::Closed;
        repo.insert(wo).await.unwrap();

        let err = repo
            .update(
                "15012024P000001",
                WorkOrderPatch {
                    client: Some("Other".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STATE");
    }

    #[tokio::test]
    async fn test_search_puts_exact_match_first() {
        let repo = InMemoryWorkOrderRepository::new();
        repo.insert(work_order("15012024P000001", None)).await.unwrap();
        repo.insert(work_order("15012024P0000011", None)).await.unwrap();
        repo.insert(work_order("15012024P000002", None)).await.unwrap();

        let ids: Vec<_> = repo
            .search("15012024P000001")
            .await
            .unwrap()
            .into_iter()
            .map(|wo| wo.id)
            .collect();
        assert_eq!(ids, vec!["15012024P000001", "15012024P0000011"]);
        assert!(repo.search("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_by_range_and_status() {
        let repo = InMemoryWorkOrderRepository::new();
        let mut jan = work_order("15012024P000001", None);
        jan.created_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        jan.status = WorkOrderStatus::Closed;
        let mut jan_open = work_order("20012024P000002", None);
        jan_open.created_at = Utc.with_ymd_and_hms(2024, 1, 20, 9, 0, 0).unwrap();
        let mut feb = work_order("01022024P000003", None);
        feb.created_at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        feb.status = WorkOrderStatus::Closed;
        for wo in [jan, jan_open, feb] {
            repo.insert(wo).await.unwrap();
        }

        let range = DateRange::from_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Some(WorkOrderStatus::Closed),
        )
        .unwrap();
        let found = repo.filter(&range).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "15012024P000001");
    }
}
