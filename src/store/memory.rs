use std::collections::HashMap;
use std::sync::RwLock;

use axum::async_trait;

use crate::store::{artifact_key, BlobStore, BlobStoreError};

/// Keeps artifacts in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn insert(&self, owner_id: &str, model_name: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut artifacts) = self.artifacts.write() {
            artifacts.insert(artifact_key(owner_id, model_name), bytes.into());
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, owner_id: &str, model_name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let key = artifact_key(owner_id, model_name);
        let artifacts = self
            .artifacts
            .read()
            .map_err(|_| BlobStoreError::fetch(&key, "artifact map poisoned"))?;
        artifacts
            .get(&key)
            .cloned()
            .ok_or(BlobStoreError::NotFound(key))
    }
}
