//! Area based contractor matching

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{DispatchResult, EntityError, LifecycleError};
use crate::core::service::ContractorDirectory;
use crate::entities::{Contractor, ContractorCandidate, WorkOrder};

/// Finds the contractors that can take a work order
///
/// Results are ordered by rate, then contractor id, so the same directory
/// snapshot always yields the same sequence.
#[derive(Clone)]
pub struct ContractorMatcher {
    directory: Arc<dyn ContractorDirectory>,
}

fn by_rate_then_id(a: &ContractorCandidate, b: &ContractorCandidate) -> Ordering {
    a.rate
        .total_cmp(&b.rate)
        .then_with(|| a.contractor_id.cmp(&b.contractor_id))
}

impl ContractorMatcher {
    pub fn new(directory: Arc<dyn ContractorDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn ContractorDirectory> {
        &self.directory
    }

    /// Active contractors serving `area`, priced at their base rate
    ///
    /// An area nobody serves yields an empty list.
    pub async fn find_by_area(&self, area: &str) -> DispatchResult<Vec<ContractorCandidate>> {
        let mut candidates: Vec<ContractorCandidate> = self
            .directory
            .list()
            .await?
            .iter()
            .filter(|c| c.active && c.serves(area))
            .map(|c| ContractorCandidate::from_contractor(c, c.rate))
            .collect();
        candidates.sort_by(by_rate_then_id);
        debug!(area, count = candidates.len(), "contractors by area");
        Ok(candidates)
    }

    /// Candidates for a specific work order, priced with the client's standard rates
    pub async fn candidates_for(&self, work_order: &WorkOrder) -> DispatchResult<Vec<ContractorCandidate>> {
        let mut candidates = Vec::new();
        for contractor in self.directory.list().await? {
            if !contractor.active || !contractor.serves(&work_order.area) {
                continue;
            }
            let rate = self
                .directory
                .standard_rate(&contractor.id, &work_order.client, &work_order.area)
                .await?
                .unwrap_or(contractor.rate);
            candidates.push(ContractorCandidate::from_contractor(&contractor, rate));
        }
        candidates.sort_by(by_rate_then_id);
        Ok(candidates)
    }

    /// Look up a contractor that may receive new work
    pub async fn resolve(&self, contractor_id: &str) -> DispatchResult<Contractor> {
        let contractor = self
            .directory
            .get(contractor_id)
            .await?
            .ok_or_else(|| EntityError::NotFound {
                entity_type: "contractor".to_string(),
                id: contractor_id.to_string(),
            })?;
        if !contractor.active {
            return Err(LifecycleError::PreconditionFailed {
                id: contractor_id.to_string(),
                reason: "contractor is inactive".to_string(),
                blocking: Vec::new(),
            }
            .into());
        }
        Ok(contractor)
    }

    /// Price `contractor` would charge for `work_order`
    pub async fn rate_for(&self, contractor: &Contractor, work_order: &WorkOrder) -> DispatchResult<f64> {
        Ok(self
            .directory
            .standard_rate(&contractor.id, &work_order.client, &work_order.area)
            .await?
            .unwrap_or(contractor.rate))
    }
}
