//! In-memory contractor directory seeded from configuration

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::core::error::{DispatchResult, StorageError};
use crate::core::service::ContractorDirectory;
use crate::entities::{Contractor, StandardRate};

#[derive(Default)]
struct Directory {
    contractors: Vec<Contractor>,
    standard_rates: Vec<StandardRate>,
}

/// Contractor directory kept in memory
///
/// Contractors are listed in the order they were added.
#[derive(Clone, Default)]
pub struct InMemoryContractorDirectory {
    inner: Arc<RwLock<Directory>>,
}

impl InMemoryContractorDirectory {
    pub fn new(contractors: Vec<Contractor>, standard_rates: Vec<StandardRate>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Directory {
                contractors,
                standard_rates,
            })),
        }
    }

    /// Add or replace a contractor (matched by id)
    pub fn upsert(&self, contractor: Contractor) -> DispatchResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StorageError::poisoned("contractor directory"))?;
        match inner.contractors.iter_mut().find(|c| c.id == contractor.id) {
            Some(existing) => *existing = contractor,
            None => inner.contractors.push(contractor),
        }
        Ok(())
    }

    /// Add or replace the price for a (contractor, client, area) triple
    pub fn set_standard_rate(&self, rate: StandardRate) -> DispatchResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StorageError::poisoned("contractor directory"))?;
        inner
            .standard_rates
            .retain(|r| !r.matches(&rate.contractor_id, &rate.client, &rate.area));
        inner.standard_rates.push(rate);
        Ok(())
    }
}

#[async_trait]
impl ContractorDirectory for InMemoryContractorDirectory {
    async fn get(&self, contractor_id: &str) -> DispatchResult<Option<Contractor>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StorageError::poisoned("contractor directory"))?;
        Ok(inner.contractors.iter().find(|c| c.id == contractor_id).cloned())
    }

    async fn list(&self) -> DispatchResult<Vec<Contractor>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StorageError::poisoned("contractor directory"))?;
        Ok(inner.contractors.clone())
    }

    async fn standard_rate(
        &self,
        contractor_id: &str,
        client: &str,
        area: &str,
    ) -> DispatchResult<Option<f64>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StorageError::poisoned("contractor directory"))?;
        Ok(inner
            .standard_rates
            .iter()
            .find(|r| r.matches(contractor_id, client, area))
            .map(|r| r.rate))
    }
}
