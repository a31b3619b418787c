pub mod cache;
pub mod fallback;
pub mod features;
pub mod output;
pub mod request;
pub mod runtime;
pub mod service;

pub use request::InferenceRequest;
pub use runtime::{ModelHandle, ModelRuntime, TractRuntime};
pub use service::{InferenceMode, InferenceResponse, InferenceService};
