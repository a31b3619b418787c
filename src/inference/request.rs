use axum::http::StatusCode;
use serde_json::Value;

use crate::bail_handler;
use crate::error::{HandlerError, HandlerResult};

/// A validated inference request. All three fields are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub uid: String,
    pub model_name: String,
    pub input: String,
}

impl InferenceRequest {
    /// Reads a request from an invocation event.
    ///
    /// The request is either the event itself or a JSON document carried as a string in its
    /// `body` field. Fields are checked in order and the first missing one is reported.
    pub fn from_event(event: &Value) -> HandlerResult<Self> {
        let nested;
        let body = match event.get("body") {
            Some(Value::String(raw)) => {
                nested = parse_body(raw.as_bytes())?;
                &nested
            }
            _ => event,
        };

        Ok(InferenceRequest {
            uid: required(body, "uid")?,
            model_name: required(body, "model_name")?,
            input: required(body, "input")?,
        })
    }

    /// Reads a request from a raw HTTP body. An empty body counts as an empty object.
    pub fn from_body(bytes: &[u8]) -> HandlerResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::from_event(&Value::Object(Default::default()));
        }
        Self::from_event(&parse_body(bytes)?)
    }
}

fn parse_body(bytes: &[u8]) -> HandlerResult<Value> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(err) => bail_handler!(StatusCode::BAD_REQUEST, "Invalid request body: {}", err),
    }
}

fn required(body: &Value, name: &str) -> HandlerResult<String> {
    match body.get(name).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(HandlerError::missing_parameter(name)),
    }
}
