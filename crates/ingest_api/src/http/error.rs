use crate::domain::IngestError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Body returned for any fault the handler did not anticipate
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Convert ingest error to an HTTP response with a `{"error": ...}` body
pub fn ingest_error_to_response(error: IngestError) -> Response {
    match error {
        IngestError::MissingBody
        | IngestError::MissingFields
        | IngestError::InvalidJson(_)
        | IngestError::InvalidText
        | IngestError::MissingTenantHeader => error_response(StatusCode::BAD_REQUEST, &error),

        IngestError::UnsupportedMediaType(_) => {
            error_response(StatusCode::UNSUPPORTED_MEDIA_TYPE, &error)
        }

        // Queue details stay in the logs
        IngestError::Enqueue(err) => {
            error!(error = %err, "failed to enqueue log envelope");
            internal_error_response()
        }
    }
}

pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}

fn error_response(status: StatusCode, error: &IngestError) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
