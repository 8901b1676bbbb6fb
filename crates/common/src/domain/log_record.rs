use crate::domain::envelope::{EnvelopeSource, LogEnvelope};
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const TENANT_KEY_PREFIX: &str = "TENANT#";
const LOG_KEY_PREFIX: &str = "LOG#";

/// Partition key for a tenant. Changing this format requires a data migration.
pub fn tenant_key(tenant_id: &str) -> String {
    format!("{}{}", TENANT_KEY_PREFIX, tenant_id)
}

/// Sort key for a log entry within a tenant
pub fn log_key(log_id: &str) -> String {
    format!("{}{}", LOG_KEY_PREFIX, log_id)
}

/// Persisted form of a processed envelope, keyed by (tenant_key, log_key)
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub tenant_key: String,
    pub log_key: String,
    pub source: EnvelopeSource,
    pub original_text: String,
    pub derived_text: String,
    pub processed_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn from_envelope(
        envelope: &LogEnvelope,
        derived_text: String,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_key: tenant_key(&envelope.tenant_id),
            log_key: log_key(&envelope.log_id),
            source: envelope.source,
            original_text: envelope.text.clone(),
            derived_text,
            processed_at,
        }
    }

    /// `processed_at` rendered as ISO-8601 with millisecond precision
    pub fn processed_at_iso(&self) -> String {
        self.processed_at
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// Repository trait for processed log storage.
///
/// `upsert` fully replaces any record stored under the same key; there is
/// no read-modify-write, so redelivered envelopes converge on one record.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LogRecordRepository: Send + Sync {
    async fn upsert(&self, record: &LogRecord) -> DomainResult<()>;

    /// Look up a record by its raw identifiers (prefixes are applied here)
    async fn find(&self, tenant_id: &str, log_id: &str) -> DomainResult<Option<LogRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation() {
        assert_eq!(tenant_key("acme"), "TENANT#acme");
        assert_eq!(log_key("L1"), "LOG#L1");
    }

    #[test]
    fn test_record_from_envelope() {
        let envelope = LogEnvelope::new("acme", "L1", EnvelopeSource::Json, "hello").unwrap();
        let now = Utc::now();

        let record = LogRecord::from_envelope(&envelope, "HELLO".to_string(), now);

        assert_eq!(record.tenant_key, "TENANT#acme");
        assert_eq!(record.log_key, "LOG#L1");
        assert_eq!(record.source, EnvelopeSource::Json);
        assert_eq!(record.original_text, "hello");
        assert_eq!(record.derived_text, "HELLO");
        assert_eq!(record.processed_at, now);
    }

    #[test]
    fn test_processed_at_iso_format() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let envelope = LogEnvelope::new("t", "l", EnvelopeSource::Json, "x").unwrap();

        let record = LogRecord::from_envelope(&envelope, "x".to_string(), at);

        assert_eq!(record.processed_at_iso(), "2024-03-01T10:20:30.123Z");
    }
}
