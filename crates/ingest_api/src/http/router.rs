use crate::domain::{IngestRequest, IngestService};
use crate::http::{ingest_error_to_response, internal_error_response};
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header naming the tenant of a `text/plain` upload
pub static TENANT_ID_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");

#[derive(Clone)]
pub struct AppState {
    service: Arc<IngestService>,
}

impl AppState {
    pub fn new(service: Arc<IngestService>) -> Self {
        Self { service }
    }
}

/// `POST /ingest` and `GET /health`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ingest", post(ingest))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(status = %rejection.status(), reason = %rejection.body_text(), "rejected request body");
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    let request = IngestRequest {
        content_type: header_str(&headers, &CONTENT_TYPE),
        tenant_id: header_str(&headers, &TENANT_ID_HEADER),
        body: has_body(&headers).then_some(body),
    };

    match state.service.accept(request).await {
        Ok(_) => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response(),
        Err(err) => {
            if err.is_client_error() {
                warn!(error = %err, "rejected ingest request");
            }
            ingest_error_to_response(err)
        }
    }
}

/// A request carries a body only when it declares framing for one
fn has_body(headers: &HeaderMap) -> bool {
    headers.contains_key(CONTENT_LENGTH) || headers.contains_key(TRANSFER_ENCODING)
}

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "ingest handler panicked");
    internal_error_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use common::domain::{
        DomainError, EnvelopeSource, LogEnvelope, MockEnvelopeProducer, XidLogIdGenerator,
    };
    use tower::ServiceExt;

    fn router(producer: MockEnvelopeProducer) -> Router {
        let service = IngestService::new(Arc::new(producer), Arc::new(XidLogIdGenerator));
        build_router(AppState::new(Arc::new(service)))
    }

    fn post_ingest(content_type: Option<&str>, tenant: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/ingest")
            .header(CONTENT_LENGTH, body.len());
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(tenant) = tenant {
            builder = builder.header("X-Tenant-ID", tenant);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), MAX_BODY_BYTES).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = router(MockEnvelopeProducer::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_json_ingest_accepted() {
        let mut producer = MockEnvelopeProducer::new();
        producer
            .expect_enqueue()
            .withf(|envelope: &LogEnvelope| {
                envelope.tenant_id == "acme"
                    && envelope.log_id == "L1"
                    && envelope.source == EnvelopeSource::Json
            })
            .times(1)
            .returning(|_| Ok(()));

        let response = router(producer)
            .oneshot(post_ingest(
                Some("application/json"),
                None,
                r#"{"tenant_id":"acme","log_id":"L1","text":"User 555-0199 logged in"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await, json!({ "status": "accepted" }));
    }

    #[tokio::test]
    async fn test_text_ingest_accepted() {
        let mut producer = MockEnvelopeProducer::new();
        producer
            .expect_enqueue()
            .withf(|envelope: &LogEnvelope| {
                envelope.tenant_id == "beta"
                    && envelope.text == "disk full"
                    && envelope.source == EnvelopeSource::TextUpload
                    && !envelope.log_id.is_empty()
            })
            .times(1)
            .returning(|_| Ok(()));

        let response = router(producer)
            .oneshot(post_ingest(Some("text/plain"), Some("beta"), "disk full"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_text_ingest_without_tenant_header() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_ingest(Some("text/plain"), None, "disk full"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "X-Tenant-ID header is required for text uploads" })
        );
    }

    #[tokio::test]
    async fn test_json_missing_fields() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_ingest(
                Some("application/json"),
                None,
                r#"{"tenant_id":"acme","text":"hello"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing required fields: tenant_id, log_id, and text are required" })
        );
    }

    #[tokio::test]
    async fn test_missing_body() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_without_body("application/json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Request body is required" })
        );
    }

    fn post_without_body(content_type: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ingest")
            .header(CONTENT_TYPE, content_type)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unsupported_media_type_without_body() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_without_body("application/xml"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Unsupported Media Type. Use application/json or text/plain" })
        );
    }

    #[tokio::test]
    async fn test_text_without_tenant_or_body_reports_missing_tenant() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_without_body("text/plain"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "X-Tenant-ID header is required for text uploads" })
        );
    }

    #[tokio::test]
    async fn test_unsupported_media_type() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let response = router(producer)
            .oneshot(post_ingest(Some("application/xml"), None, "<log/>"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Unsupported Media Type. Use application/json or text/plain" })
        );
    }

    #[tokio::test]
    async fn test_enqueue_failure_is_internal_error() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(1).returning(|_| {
            Err(DomainError::QueueError(anyhow::anyhow!("stream unavailable")))
        });

        let response = router(producer)
            .oneshot(post_ingest(
                Some("application/json"),
                None,
                r#"{"tenant_id":"acme","log_id":"L1","text":"hello"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);

        let body = "x".repeat(MAX_BODY_BYTES + 1);
        let response = router(producer)
            .oneshot(post_ingest(Some("text/plain"), Some("acme"), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
