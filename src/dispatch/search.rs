//! Search and filter over the work order repository

use std::sync::Arc;
use tracing::debug;

use crate::core::error::{DispatchError, DispatchResult, EntityError};
use crate::core::query::FilterQuery;
use crate::core::service::WorkOrderRepository;
use crate::entities::{WorkOrder, WorkOrderStatus};

/// Thin query layer over the repository; holds no state of its own
#[derive(Clone)]
pub struct SearchIndex {
    repository: Arc<dyn WorkOrderRepository>,
}

impl SearchIndex {
    pub fn new(repository: Arc<dyn WorkOrderRepository>) -> Self {
        Self { repository }
    }

    /// Work orders whose id equals or contains `query`; empty query, empty result
    pub async fn search(&self, query: &str) -> DispatchResult<Vec<WorkOrder>> {
        let results = self.repository.search(query).await?;
        debug!(query, count = results.len(), "work order search");
        Ok(results)
    }

    /// The OPEN match if there is one, else the first match
    pub async fn select_active(&self, query: &str) -> DispatchResult<WorkOrder> {
        let results = self.search(query).await?;
        let selected = match results.iter().position(|wo| wo.status == WorkOrderStatus::Open) {
            Some(index) => results.into_iter().nth(index),
            None => results.into_iter().next(),
        };
        selected.ok_or_else(|| {
            DispatchError::Entity(EntityError::NotFound {
                entity_type: "work_order".to_string(),
                id: query.trim().to_string(),
            })
        })
    }

    /// Work orders created within the query's date range, optionally by status
    pub async fn filter(&self, query: &FilterQuery) -> DispatchResult<Vec<WorkOrder>> {
        let range = query.range()?;
        debug!(from = %range.from, to = %range.to, status = ?range.status, "work order filter");
        self.repository.filter(&range).await
    }
}
