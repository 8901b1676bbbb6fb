use crate::domain::LogProcessingService;
use common::domain::{DomainResult, LogEnvelope, LogRecord};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-envelope results of one batch, in delivery order
#[derive(Debug)]
pub struct BatchOutcome {
    results: Vec<DomainResult<LogRecord>>,
}

impl BatchOutcome {
    pub fn new(results: Vec<DomainResult<LogRecord>>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[DomainResult<LogRecord>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True only when every envelope was persisted
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Message of the first failure in delivery order
    pub fn first_error(&self) -> Option<String> {
        self.results
            .iter()
            .find_map(|r| r.as_ref().err().map(|e| e.to_string()))
    }
}

/// Processes every envelope of a delivered batch concurrently
pub struct BatchWorker {
    service: Arc<LogProcessingService>,
}

impl BatchWorker {
    pub fn new(service: Arc<LogProcessingService>) -> Self {
        Self { service }
    }

    /// Waits for every envelope to finish; one failure never cancels the others
    #[instrument(skip(self, envelopes), fields(batch_size = envelopes.len()))]
    pub async fn process_batch(&self, envelopes: &[LogEnvelope]) -> BatchOutcome {
        let results = join_all(envelopes.iter().map(|envelope| self.service.process(envelope))).await;
        let outcome = BatchOutcome::new(results);

        if outcome.is_success() {
            debug!(succeeded = outcome.succeeded(), "batch processed");
        } else {
            warn!(
                succeeded = outcome.succeeded(),
                failed = outcome.failed(),
                first_error = ?outcome.first_error(),
                "batch processed with failures"
            );
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FaultInjectionConfig, IdentityTransformer, ProcessingSettings};
    use crate::memory::InMemoryLogRecordRepository;
    use common::domain::{EnvelopeSource, LogRecordRepository};
    use std::time::Duration;

    fn worker(
        repository: InMemoryLogRecordRepository,
        cost_per_char: Duration,
    ) -> BatchWorker {
        let service = LogProcessingService::new(
            Arc::new(repository),
            Arc::new(IdentityTransformer),
            ProcessingSettings {
                cost_per_char,
                fault_injection: FaultInjectionConfig::enabled("crash-test"),
            },
        );
        BatchWorker::new(Arc::new(service))
    }

    fn envelope(log_id: &str, text: &str) -> LogEnvelope {
        LogEnvelope::new("acme", log_id, EnvelopeSource::Json, text).unwrap()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let repository = InMemoryLogRecordRepository::new();
        let worker = worker(repository.clone(), Duration::ZERO);

        let outcome = worker
            .process_batch(&[
                envelope("L1", "first"),
                envelope("crash-test", "boom"),
                envelope("L3", "third"),
            ])
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.failed(), 1);
        assert!(outcome.results()[1].is_err());
        assert!(outcome
            .first_error()
            .unwrap()
            .contains("crash-test"));

        assert_eq!(repository.len().await, 2);
        assert!(repository.find("acme", "L1").await.unwrap().is_some());
        assert!(repository.find("acme", "L3").await.unwrap().is_some());
        assert!(repository.find("acme", "crash-test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redelivered_envelope_converges_on_one_record() {
        let repository = InMemoryLogRecordRepository::new();
        let worker = worker(repository.clone(), Duration::ZERO);
        let batch = [envelope("L1", "hello")];

        let first = worker.process_batch(&batch).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = worker.process_batch(&batch).await;

        let first_at = first.results()[0].as_ref().unwrap().processed_at;
        let second_at = second.results()[0].as_ref().unwrap().processed_at;
        let stored = repository.find("acme", "L1").await.unwrap().unwrap();

        assert_eq!(repository.len().await, 1);
        assert!(second_at > first_at);
        assert_eq!(stored.processed_at, second_at);
        assert_eq!(stored.original_text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_envelopes_are_processed_concurrently() {
        let repository = InMemoryLogRecordRepository::new();
        let worker = worker(repository.clone(), Duration::from_millis(10));

        let started = tokio::time::Instant::now();
        let outcome = worker
            .process_batch(&[
                envelope("L1", "0123456789"),
                envelope("L2", "0123456789"),
                envelope("L3", "0123456789"),
            ])
            .await;

        assert!(outcome.is_success());
        // three 100ms envelopes overlap instead of adding up
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let worker = worker(InMemoryLogRecordRepository::new(), Duration::ZERO);

        let outcome = worker.process_batch(&[]).await;

        assert!(outcome.is_empty());
        assert!(outcome.is_success());
    }
}
