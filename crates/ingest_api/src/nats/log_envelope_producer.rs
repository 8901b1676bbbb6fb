use anyhow::Context;
use async_trait::async_trait;
use common::domain::{DomainError, DomainResult, EnvelopeProducer, LogEnvelope};
use common::nats::{JetStreamPublisher, subject_token};
use std::sync::Arc;
use tracing::{debug, info};

/// NATS JetStream producer for LogEnvelope messages
pub struct NatsEnvelopeProducer {
    jetstream: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsEnvelopeProducer {
    pub fn new(jetstream: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        info!(
            "Created NatsEnvelopeProducer with base subject: {}",
            base_subject
        );
        Self {
            jetstream,
            base_subject,
        }
    }

    /// `{base_subject}.{tenant_id}`, with the tenant escaped into one subject token
    pub fn subject_for(&self, envelope: &LogEnvelope) -> String {
        format!("{}.{}", self.base_subject, subject_token(&envelope.tenant_id))
    }
}

#[async_trait]
impl EnvelopeProducer for NatsEnvelopeProducer {
    async fn enqueue(&self, envelope: &LogEnvelope) -> DomainResult<()> {
        let payload = envelope.to_json_bytes()?;
        let subject = self.subject_for(envelope);

        debug!(
            subject = %subject,
            tenant_id = %envelope.tenant_id,
            log_id = %envelope.log_id,
            size_bytes = payload.len(),
            "Publishing LogEnvelope"
        );

        // Returns only after the stream acknowledged the write
        self.jetstream
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish and acknowledge message")
            .map_err(DomainError::QueueError)?;

        debug!(
            subject = %subject,
            log_id = %envelope.log_id,
            "Successfully published LogEnvelope"
        );

        Ok(())
    }
}
