use crate::domain::{FaultInjectionConfig, TextTransformer};
use chrono::Utc;
use common::domain::{DomainError, DomainResult, LogEnvelope, LogRecord, LogRecordRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Tunables for per-envelope processing
#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    /// Simulated work per character of text; zero disables the delay
    pub cost_per_char: Duration,
    pub fault_injection: FaultInjectionConfig,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            cost_per_char: Duration::from_millis(50),
            fault_injection: FaultInjectionConfig::default(),
        }
    }
}

/// Domain service that turns one envelope into a persisted record
///
/// Flow:
/// 1. Fail deliberately if the envelope carries the fault injection marker
/// 2. Spend the processing cost proportional to the text length
/// 3. Derive the record and upsert it
///
/// Failures are returned, never retried here.
pub struct LogProcessingService {
    repository: Arc<dyn LogRecordRepository>,
    transformer: Arc<dyn TextTransformer>,
    settings: ProcessingSettings,
}

impl LogProcessingService {
    pub fn new(
        repository: Arc<dyn LogRecordRepository>,
        transformer: Arc<dyn TextTransformer>,
        settings: ProcessingSettings,
    ) -> Self {
        Self {
            repository,
            transformer,
            settings,
        }
    }

    #[instrument(skip(self, envelope), fields(tenant_id = %envelope.tenant_id, log_id = %envelope.log_id))]
    pub async fn process(&self, envelope: &LogEnvelope) -> DomainResult<LogRecord> {
        envelope.validate()?;

        if self.settings.fault_injection.should_fail(&envelope.log_id) {
            warn!(log_id = %envelope.log_id, "crash simulation triggered for envelope");
            return Err(DomainError::InjectedFault(envelope.log_id.clone()));
        }

        let cost = self.processing_cost(&envelope.text);
        if !cost.is_zero() {
            debug!(cost_ms = cost.as_millis() as u64, "simulating processing cost");
            tokio::time::sleep(cost).await;
        }

        let derived_text = self.transformer.transform(envelope)?;
        let record = LogRecord::from_envelope(envelope, derived_text, Utc::now());

        self.repository.upsert(&record).await?;

        debug!(
            tenant_key = %record.tenant_key,
            log_key = %record.log_key,
            processed_at = %record.processed_at_iso(),
            "persisted log record"
        );

        Ok(record)
    }

    fn processing_cost(&self, text: &str) -> Duration {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        self.settings.cost_per_char.saturating_mul(chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdentityTransformer, MockTextTransformer};
    use common::domain::{EnvelopeSource, MockLogRecordRepository};

    fn settings(cost_ms: u64, fault_injection: FaultInjectionConfig) -> ProcessingSettings {
        ProcessingSettings {
            cost_per_char: Duration::from_millis(cost_ms),
            fault_injection,
        }
    }

    fn envelope(log_id: &str, text: &str) -> LogEnvelope {
        LogEnvelope {
            tenant_id: "acme".to_string(),
            log_id: log_id.to_string(),
            source: EnvelopeSource::Json,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_persists_derived_record() {
        let mut repository = MockLogRecordRepository::new();
        repository
            .expect_upsert()
            .withf(|record: &LogRecord| {
                record.tenant_key == "TENANT#acme"
                    && record.log_key == "LOG#L1"
                    && record.original_text == "hello"
                    && record.derived_text == "hello"
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            settings(0, FaultInjectionConfig::default()),
        );

        let record = service.process(&envelope("L1", "hello")).await.unwrap();

        assert_eq!(record.source, EnvelopeSource::Json);
    }

    #[tokio::test]
    async fn test_fault_injection_skips_persistence() {
        let mut repository = MockLogRecordRepository::new();
        repository.expect_upsert().times(0);

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            settings(0, FaultInjectionConfig::enabled("crash-test")),
        );

        let result = service.process(&envelope("crash-test", "boom")).await;

        assert!(matches!(result, Err(DomainError::InjectedFault(id)) if id == "crash-test"));
    }

    #[tokio::test]
    async fn test_marker_is_ignored_when_fault_injection_disabled() {
        let mut repository = MockLogRecordRepository::new();
        repository.expect_upsert().times(1).returning(|_| Ok(()));

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            settings(0, FaultInjectionConfig::default()),
        );

        assert!(service.process(&envelope("crash-test", "boom")).await.is_ok());
    }

    #[tokio::test]
    async fn test_repository_error_is_propagated() {
        let mut repository = MockLogRecordRepository::new();
        repository
            .expect_upsert()
            .times(1)
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("store down"))));

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            settings(0, FaultInjectionConfig::default()),
        );

        let result = service.process(&envelope("L1", "hello")).await;

        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }

    #[tokio::test]
    async fn test_transformer_output_is_stored() {
        let mut transformer = MockTextTransformer::new();
        transformer
            .expect_transform()
            .times(1)
            .returning(|envelope| Ok(envelope.text.to_uppercase()));
        let mut repository = MockLogRecordRepository::new();
        repository
            .expect_upsert()
            .withf(|record: &LogRecord| record.derived_text == "HELLO")
            .times(1)
            .returning(|_| Ok(()));

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(transformer),
            settings(0, FaultInjectionConfig::default()),
        );

        let record = service.process(&envelope("L1", "hello")).await.unwrap();

        assert_eq!(record.original_text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_cost_scales_with_characters() {
        let mut repository = MockLogRecordRepository::new();
        repository.expect_upsert().times(1).returning(|_| Ok(()));

        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            settings(50, FaultInjectionConfig::default()),
        );

        let started = tokio::time::Instant::now();
        service.process(&envelope("L1", "héllo")).await.unwrap();

        // five characters, not six bytes
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(300));
    }
}
