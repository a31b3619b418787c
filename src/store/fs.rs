use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use axum::async_trait;
use tracing::debug;

use crate::store::{artifact_key, BlobStore, BlobStoreError};

/// Serves artifacts from `<root>/<owner_id>/<model_name>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(&self, owner_id: &str, model_name: &str) -> Option<PathBuf> {
        if !is_single_component(owner_id) || !is_single_component(model_name) {
            return None;
        }
        Some(self.root.join(owner_id).join(model_name))
    }
}

fn is_single_component(part: &str) -> bool {
    let mut components = Path::new(part).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, owner_id: &str, model_name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let key = artifact_key(owner_id, model_name);
        let Some(path) = self.artifact_path(owner_id, model_name) else {
            return Err(BlobStoreError::fetch(&key, "invalid artifact key"));
        };

        debug!("Reading artifact from {}", path.display());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(BlobStoreError::NotFound(key)),
            Err(err) => Err(BlobStoreError::fetch(&key, err)),
        }
    }
}
