use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::HandlerResult;
use crate::headers::CORS_HEADERS;
use crate::inference::InferenceRequest;
use crate::AppState;

#[derive(Serialize, Debug)]
pub(crate) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    cached_model: Option<String>,
}

#[axum_macros::debug_handler]
pub(crate) async fn handle_infer_request(
    State(state): State<AppState>,
    body: Bytes,
) -> HandlerResult<impl IntoResponse> {
    let request = InferenceRequest::from_body(&body)?;
    let response = state.service.infer(request).await;
    Ok((StatusCode::OK, CORS_HEADERS, Json(response)))
}

pub(crate) async fn handle_preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, CORS_HEADERS)
}

pub(crate) async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        cached_model: state.service.cached_key().await,
    })
}
