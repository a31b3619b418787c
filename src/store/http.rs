use anyhow::{anyhow, Result};
use axum::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::store::{artifact_key, BlobStore, BlobStoreError};

/// Fetches artifacts from an S3 style bucket endpoint as `<base>/<owner_id>/<model_name>`.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    base: Url,
}

impl HttpBlobStore {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("Bucket URL {base} cannot be used as a base"));
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub(crate) fn artifact_url(&self, owner_id: &str, model_name: &str) -> Option<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(owner_id)
            .push(model_name);
        Some(url)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, owner_id: &str, model_name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let key = artifact_key(owner_id, model_name);
        let url = self
            .artifact_url(owner_id, model_name)
            .ok_or_else(|| BlobStoreError::fetch(&key, "invalid bucket URL"))?;

        debug!("Downloading artifact from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BlobStoreError::fetch(&key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BlobStoreError::NotFound(key)),
            status if !status.is_success() => {
                Err(BlobStoreError::fetch(&key, format!("bucket answered {status}")))
            }
            _ => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| BlobStoreError::fetch(&key, e))?;
                debug!("Artifact size: {:.2} MB", bytes.len() as f64 / (1024.0 * 1024.0));
                Ok(bytes.to_vec())
            }
        }
    }
}
