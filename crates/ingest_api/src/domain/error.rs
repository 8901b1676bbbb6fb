use common::domain::DomainError;
use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

/// Reasons an ingest request is rejected synchronously
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Request body is required")]
    MissingBody,

    #[error("Missing required fields: tenant_id, log_id, and text are required")]
    MissingFields,

    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Request body must be valid UTF-8 text")]
    InvalidText,

    #[error("X-Tenant-ID header is required for text uploads")]
    MissingTenantHeader,

    #[error("Unsupported Media Type. Use application/json or text/plain")]
    UnsupportedMediaType(Option<String>),

    #[error("Failed to enqueue envelope: {0}")]
    Enqueue(#[source] DomainError),
}

impl IngestError {
    /// Client input problems are never retried and are reported back verbatim
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::Enqueue(_))
    }
}
