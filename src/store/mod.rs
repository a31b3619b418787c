use axum::async_trait;
use thiserror::Error;

pub mod fs;
pub mod http;
#[cfg(test)]
pub mod memory;

pub use fs::FsBlobStore;
pub use http::HttpBlobStore;
#[cfg(test)]
pub use memory::MemoryBlobStore;

/// Failure modes of a model artifact lookup.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("artifact {0} not found")]
    NotFound(String),

    #[error("failed to fetch artifact {key}: {message}")]
    Fetch { key: String, message: String },
}

impl BlobStoreError {
    pub(crate) fn fetch(key: &str, message: impl ToString) -> Self {
        BlobStoreError::Fetch {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Source of serialized model artifacts, addressed by owner id and model file name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, owner_id: &str, model_name: &str) -> Result<Vec<u8>, BlobStoreError>;
}

pub(crate) fn artifact_key(owner_id: &str, model_name: &str) -> String {
    format!("{owner_id}/{model_name}")
}
