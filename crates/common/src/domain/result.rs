use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue error: {0}")]
    QueueError(#[source] anyhow::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[source] anyhow::Error),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Injected fault for log {0}")]
    InjectedFault(String),
}
