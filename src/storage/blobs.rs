//! In-memory blob store for image attachments

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::core::error::DependencyError;
use crate::core::service::BlobStore;

/// Keeps uploaded images in memory and hands out `blob://` references
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unavailable() -> DependencyError {
    DependencyError::new("blob store", "lock poisoned")
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        work_order_id: &str,
        kind: &str,
        bytes: Vec<u8>,
    ) -> Result<String, DependencyError> {
        let reference = format!("blob://{}/{}/{}", work_order_id, kind, Uuid::new_v4());
        let mut blobs = self.blobs.write().map_err(|_| unavailable())?;
        blobs.insert(reference.clone(), bytes);
        Ok(reference)
    }

    async fn get(&self, reference: &str) -> Result<Option<Vec<u8>>, DependencyError> {
        let blobs = self.blobs.read().map_err(|_| unavailable())?;
        Ok(blobs.get(reference).cloned())
    }
}
