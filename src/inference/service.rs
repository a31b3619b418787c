use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::inference::cache::{CacheKey, ModelCache};
use crate::inference::features;
use crate::inference::fallback;
use crate::inference::output::{OutputTensor, Prediction};
use crate::inference::request::InferenceRequest;
use crate::inference::runtime::{ModelHandle, ModelRuntime};
use crate::store::{BlobStore, BlobStoreError};

pub const MODEL_TYPE: &str = "onnx";

/// Whether the prediction came from the requested model or from the fallback scores.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    Real,
    Fallback,
}

#[derive(Serialize, Debug, Clone)]
pub struct InferenceResponse {
    pub prediction: Prediction,
    pub model: String,
    pub uid: String,
    pub input_length: usize,
    pub latency_ms: u64,
    pub cached: bool,
    pub model_type: &'static str,
    pub mode: InferenceMode,
}

/// Outcome of resolving a model for a request.
pub enum ModelState {
    Loaded(Arc<dyn ModelHandle>),
    Unavailable(UnavailableReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnavailableReason {
    NotFound,
    Fetch(String),
    Parse(String),
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::NotFound => write!(f, "model not found"),
            UnavailableReason::Fetch(message) => write!(f, "model fetch failed: {message}"),
            UnavailableReason::Parse(message) => write!(f, "model load failed: {message}"),
        }
    }
}

/// Resolves models from a blob store, keeps the last one loaded and answers requests with it.
pub struct InferenceService {
    store: Arc<dyn BlobStore>,
    runtime: Arc<dyn ModelRuntime>,
    cache: Mutex<ModelCache>,
}

impl InferenceService {
    pub fn new(store: Arc<dyn BlobStore>, runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            store,
            runtime,
            cache: Mutex::new(ModelCache::default()),
        }
    }

    /// Key of the model currently held in the cache slot.
    pub async fn cached_key(&self) -> Option<String> {
        self.cache.lock().await.key().map(CacheKey::to_string)
    }

    /// Answers a validated request. Model failures never fail the request, they switch it
    /// to fallback scores.
    #[tracing::instrument(level = "info", skip_all, fields(uid = %request.uid, model = %request.model_name))]
    pub async fn infer(&self, request: InferenceRequest) -> InferenceResponse {
        let start = Instant::now();
        let key = CacheKey::new(&request.uid, &request.model_name);

        let (state, cached) = self.resolve(&key, &request).await;
        let (output, mode) = match state {
            ModelState::Loaded(handle) => match run_model(handle, &request.input).await {
                Ok(output) => (output, InferenceMode::Real),
                Err(err) => {
                    warn!("Inference error, falling back: {err:#}");
                    (fallback::scores(&request.input), InferenceMode::Fallback)
                }
            },
            ModelState::Unavailable(reason) => {
                info!("Using fallback scores for {key}: {reason}");
                (fallback::scores(&request.input), InferenceMode::Fallback)
            }
        };

        InferenceResponse {
            prediction: Prediction::from_output(output),
            input_length: request.input.chars().count(),
            model: request.model_name,
            uid: request.uid,
            latency_ms: start.elapsed().as_millis() as u64,
            cached,
            model_type: MODEL_TYPE,
            mode,
        }
    }

    /// Looks the model up in the cache slot, loading it on a miss. Returns whether the slot
    /// was hit. The slot is only written after a successful load.
    async fn resolve(&self, key: &CacheKey, request: &InferenceRequest) -> (ModelState, bool) {
        let mut cache = self.cache.lock().await;
        if let Some(handle) = cache.get(key) {
            info!("Warm start - using cached model for {key}");
            return (ModelState::Loaded(handle), true);
        }

        info!("Cold start - loading model for {key}");
        let bytes = match self.store.get(&request.uid, &request.model_name).await {
            Ok(bytes) => bytes,
            Err(BlobStoreError::NotFound(_)) => {
                return (ModelState::Unavailable(UnavailableReason::NotFound), false)
            }
            Err(err) => {
                warn!("{err}");
                return (ModelState::Unavailable(UnavailableReason::Fetch(err.to_string())), false);
            }
        };

        let runtime = self.runtime.clone();
        let loaded = tokio::task::spawn_blocking(move || runtime.load(&bytes))
            .await
            .unwrap_or_else(|err| Err(anyhow!("Model loader panicked: {err}")));
        match loaded {
            Ok(handle) => {
                info!(
                    "Model inputs: {:?}, outputs: {:?}",
                    handle.inputs(),
                    handle.outputs()
                );
                cache.store(key.clone(), handle.clone());
                (ModelState::Loaded(handle), false)
            }
            Err(err) => {
                warn!("Error loading model {key}: {err:#}");
                (ModelState::Unavailable(UnavailableReason::Parse(format!("{err:#}"))), false)
            }
        }
    }
}

/// Runs the forward pass off the async workers. A panicking runtime counts as an execution error.
async fn run_model(handle: Arc<dyn ModelHandle>, text: &str) -> Result<OutputTensor> {
    let features = features::extract(text);
    tokio::task::spawn_blocking(move || {
        let input_name = handle
            .inputs()
            .first()
            .ok_or_else(|| anyhow!("Model declares no inputs"))?;
        handle.run(input_name, &features)
    })
    .await
    .unwrap_or_else(|err| Err(anyhow!("Model runtime panicked: {err}")))
}
