use crate::domain::{BatchFailurePolicy, BatchOutcome, BatchWorker};
use common::domain::LogEnvelope;
use common::nats::{BatchProcessor, ProcessingResult, QueueMessage, link_span_to_headers};
use std::sync::Arc;
use tracing::{Instrument, error, info_span, warn};

/// Create a BatchProcessor that decodes LogEnvelope messages and runs them through the worker
pub fn create_log_envelope_processor(
    worker: Arc<BatchWorker>,
    policy: BatchFailurePolicy,
) -> BatchProcessor {
    Box::new(move |messages: &[QueueMessage]| {
        let worker = Arc::clone(&worker);
        let span = info_span!("process_log_batch", batch_size = messages.len(), policy = %policy);

        // One batch span; parented to the first publisher that sent trace context
        link_span_to_headers(&span, messages.iter().find_map(|msg| msg.headers.as_ref()));

        // Decode up front; QueueMessage borrows from the slice
        let mut envelopes = Vec::with_capacity(messages.len());
        let mut decode_failures = Vec::new();
        for (idx, msg) in messages.iter().enumerate() {
            match LogEnvelope::from_json_slice(&msg.payload) {
                Ok(envelope) => envelopes.push((idx, envelope)),
                Err(e) => {
                    error!(
                        error = %e,
                        subject = %msg.subject,
                        "failed to decode LogEnvelope message"
                    );
                    decode_failures.push((idx, format!("Decode error: {}", e)));
                }
            }
        }
        let batch_size = messages.len();

        Box::pin(
            async move {
                let (indices, batch): (Vec<usize>, Vec<LogEnvelope>) = envelopes.into_iter().unzip();
                let outcome = worker.process_batch(&batch).await;
                Ok(settle_outcome(
                    batch_size,
                    &indices,
                    &outcome,
                    decode_failures,
                    policy,
                ))
            }
            .instrument(span),
        )
    })
}

/// Map per-envelope outcomes back onto message indices under the failure policy
pub fn settle_outcome(
    batch_size: usize,
    indices: &[usize],
    outcome: &BatchOutcome,
    decode_failures: Vec<(usize, String)>,
    policy: BatchFailurePolicy,
) -> ProcessingResult {
    let mut failures: Vec<(usize, String)> = decode_failures;
    let mut succeeded = Vec::new();
    for (idx, result) in indices.iter().zip(outcome.results()) {
        match result {
            Ok(_) => succeeded.push(*idx),
            Err(e) => failures.push((*idx, e.to_string())),
        }
    }

    if failures.is_empty() {
        return ProcessingResult::ack_all(batch_size);
    }

    match policy {
        BatchFailurePolicy::PerEnvelope => {
            let nak = failures
                .into_iter()
                .map(|(idx, reason)| (idx, Some(reason)))
                .collect();
            ProcessingResult::new(succeeded, nak)
        }
        BatchFailurePolicy::WholeBatch => {
            warn!(
                failed = failures.len(),
                redelivered = batch_size,
                "batch failed, rejecting every message for redelivery"
            );
            let batch_reason = format!("batch failed: {}", failures[0].1);
            let mut nak: Vec<(usize, Option<String>)> = (0..batch_size)
                .map(|idx| (idx, Some(batch_reason.clone())))
                .collect();
            // Failed messages keep their own reason for the dead letter header
            for (idx, reason) in failures {
                if let Some(entry) = nak.get_mut(idx) {
                    entry.1 = Some(reason);
                }
            }
            ProcessingResult::new(Vec::new(), nak)
        }
    }
}
