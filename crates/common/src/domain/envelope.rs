use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a log entry reached the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeSource {
    Json,
    TextUpload,
}

impl EnvelopeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeSource::Json => "json",
            EnvelopeSource::TextUpload => "text_upload",
        }
    }
}

impl fmt::Display for EnvelopeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnvelopeSource {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "json" => Ok(EnvelopeSource::Json),
            "text_upload" => Ok(EnvelopeSource::TextUpload),
            other => Err(DomainError::InvalidEnvelope(format!(
                "unknown envelope source: {}",
                other
            ))),
        }
    }
}

/// Normalized unit of work handed from the ingest API to the worker.
///
/// Serialized as JSON (`tenantId`, `logId`, `source`, `text`) across the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEnvelope {
    pub tenant_id: String,
    pub log_id: String,
    pub source: EnvelopeSource,
    pub text: String,
}

impl LogEnvelope {
    /// Build an envelope, rejecting empty identifiers
    pub fn new(
        tenant_id: impl Into<String>,
        log_id: impl Into<String>,
        source: EnvelopeSource,
        text: impl Into<String>,
    ) -> DomainResult<Self> {
        let envelope = Self {
            tenant_id: tenant_id.into(),
            log_id: log_id.into(),
            source,
            text: text.into(),
        };
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.tenant_id.is_empty() {
            return Err(DomainError::InvalidEnvelope(
                "tenantId must not be empty".to_string(),
            ));
        }
        if self.log_id.is_empty() {
            return Err(DomainError::InvalidEnvelope(
                "logId must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json_bytes(&self) -> DomainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an envelope from the queue payload and re-check its invariants
    pub fn from_json_slice(payload: &[u8]) -> DomainResult<Self> {
        let envelope: LogEnvelope = serde_json::from_slice(payload)?;
        envelope.validate()?;
        Ok(envelope)
    }
}

/// Port for handing envelopes to the durable queue.
///
/// Implementations must only return `Ok` once the queue has durably accepted
/// the envelope.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EnvelopeProducer: Send + Sync {
    async fn enqueue(&self, envelope: &LogEnvelope) -> DomainResult<()>;
}

/// Source of log ids for uploads that do not carry one
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait LogIdGenerator: Send + Sync {
    fn next_log_id(&self) -> String;
}

/// Globally unique, sortable ids backed by `xid`
#[derive(Debug, Clone, Copy, Default)]
pub struct XidLogIdGenerator;

impl LogIdGenerator for XidLogIdGenerator {
    fn next_log_id(&self) -> String {
        xid::new().to_string()
    }
}
