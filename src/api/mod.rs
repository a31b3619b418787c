use std::any::Any;

use anyhow::anyhow;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::error::HandlerError;
use crate::AppState;

mod handlers;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/infer",
            post(handlers::handle_infer_request).options(handlers::handle_preflight),
        )
        .route("/health", get(handlers::handle_health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Turns a panicking handler into the regular 500 error body.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    HandlerError::from(anyhow!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::inference::service::tests::{StubRuntime, STUB_MODEL};
    use crate::inference::runtime::tests::labelled_sentiment_model;
    use crate::inference::{InferenceService, TractRuntime};
    use crate::store::{BlobStore, BlobStoreError, MemoryBlobStore};

    fn test_router() -> Router {
        let store = Arc::new(MemoryBlobStore::default());
        store.insert("u1", "real.onnx", STUB_MODEL);
        let service = InferenceService::new(store, Arc::new(StubRuntime::default()));
        router(AppState {
            service: Arc::new(service),
        })
    }

    struct PanickingStore;

    #[async_trait]
    impl BlobStore for PanickingStore {
        async fn get(&self, _: &str, _: &str) -> Result<Vec<u8>, BlobStoreError> {
            panic!("store exploded");
        }
    }

    async fn send(router: Router, method: Method, uri: &str, body: Body) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        router.oneshot(request).await.unwrap()
    }

    async fn post_json(router: Router, body: Value) -> (StatusCode, Response) {
        let response = send(router, Method::POST, "/infer", Body::from(body.to_string())).await;
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn missing_model_still_answers() {
        let (status, response) = post_json(
            test_router(),
            json!({"uid": "u1", "model_name": "m.onnx", "input": "great product"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );

        let body = json_body(response).await;
        let sentiment = body["prediction"]["sentiment"].as_str().unwrap();
        assert!(sentiment == "positive" || sentiment == "negative");
        let sum: f64 = body["prediction"]["probabilities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_f64().unwrap())
            .sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(body["mode"], "fallback");
        assert_eq!(body["model_type"], "onnx");
        assert_eq!(body["model"], "m.onnx");
        assert_eq!(body["uid"], "u1");
        assert_eq!(body["input_length"], 13);
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let (status, response) = post_json(
            test_router(),
            json!({"uid": "u1", "model_name": "m.onnx", "input": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response.headers().get("access-control-allow-origin").is_none());

        let body = json_body(response).await;
        assert_eq!(body["error"], "Missing required parameter: input");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let response = send(test_router(), Method::POST, "/infer", Body::from("{uid")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn nested_bodies_are_accepted() {
        let inner = json!({"uid": "u1", "model_name": "real.onnx", "input": "great product"});
        let (status, response) = post_json(test_router(), json!({"body": inner.to_string()})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await["mode"], "real");
    }

    #[tokio::test]
    async fn second_request_is_warm() {
        let router = test_router();
        let request = json!({"uid": "u1", "model_name": "real.onnx", "input": "nice"});

        let (_, first) = post_json(router.clone(), request.clone()).await;
        let (_, second) = post_json(router.clone(), request).await;
        assert_eq!(json_body(first).await["cached"], false);
        assert_eq!(json_body(second).await["cached"], true);

        let health = send(router, Method::GET, "/health", Body::empty()).await;
        assert_eq!(health.status(), StatusCode::OK);
        let health = json_body(health).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["cached_model"], "u1/real.onnx");
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let service = InferenceService::new(
            Arc::new(PanickingStore),
            Arc::new(StubRuntime::default()),
        );
        let router = router(AppState {
            service: Arc::new(service),
        });

        let (status, response) = post_json(
            router,
            json!({"uid": "u1", "model_name": "m.onnx", "input": "great product"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("access-control-allow-origin").is_none());
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Internal server error: handler panicked: store exploded"
        );
    }

    #[tokio::test]
    async fn onnx_model_answers_over_http() {
        let store = Arc::new(MemoryBlobStore::default());
        store.insert("u1", "labelled.onnx", labelled_sentiment_model());
        let service = InferenceService::new(store, Arc::new(TractRuntime));
        let router = router(AppState {
            service: Arc::new(service),
        });

        let (status, response) = post_json(
            router,
            json!({"uid": "u1", "model_name": "labelled.onnx", "input": "great product"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["mode"], "real");
        assert_eq!(body["prediction"]["shape"], json!([1, 2]));
    }

    #[tokio::test]
    async fn preflight_answers_with_cors_headers() {
        let response = send(test_router(), Method::OPTIONS, "/infer", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "POST, OPTIONS"
        );
    }
}
