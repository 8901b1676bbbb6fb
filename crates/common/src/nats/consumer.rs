use crate::nats::message::QueueMessage;
use crate::nats::traits::{JetStreamConsumer, JetStreamPublisher, PullConsumer};
use anyhow::{Context, Result};
use async_nats::HeaderMap;
use async_nats::jetstream;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Header carrying the last processing error of a dead-lettered message
pub const DLQ_REASON_HEADER: &str = "Logflow-Dlq-Reason";
/// Header carrying the number of delivery attempts of a dead-lettered message
pub const DLQ_DELIVERY_COUNT_HEADER: &str = "Logflow-Delivery-Count";
/// Header carrying the subject a dead-lettered message was originally published to
pub const DLQ_ORIGINAL_SUBJECT_HEADER: &str = "Logflow-Original-Subject";

/// Result of processing a batch of messages
/// Provides fine-grained control over which messages to acknowledge vs reject
#[derive(Debug, Default, PartialEq)]
pub struct ProcessingResult {
    /// Messages that were successfully processed and should be acknowledged (Ack)
    pub ack: Vec<usize>,
    /// Messages that failed processing and should be rejected (Nak) with optional error details
    pub nak: Vec<(usize, Option<String>)>,
}

impl ProcessingResult {
    /// Create a result where all messages should be acknowledged
    pub fn ack_all(count: usize) -> Self {
        Self {
            ack: (0..count).collect(),
            nak: Vec::new(),
        }
    }

    /// Create a result where all messages should be rejected
    pub fn nak_all(count: usize, error: Option<String>) -> Self {
        Self {
            ack: Vec::new(),
            nak: (0..count).map(|i| (i, error.clone())).collect(),
        }
    }

    /// Create a result with specific ack/nak indices
    pub fn new(ack: Vec<usize>, nak: Vec<(usize, Option<String>)>) -> Self {
        Self { ack, nak }
    }
}

/// Type alias for the batch processor function
/// Takes a slice of delivered messages and returns a ProcessingResult
/// The processor is responsible for deserializing and processing the messages
pub type BatchProcessor =
    Box<dyn Fn(&[QueueMessage]) -> BoxFuture<'static, Result<ProcessingResult>> + Send + Sync>;

/// Settings for a durable pull consumer
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub stream_name: String,
    pub consumer_name: String,
    pub subject_filter: String,
    pub batch_size: usize,
    pub max_wait: Duration,
    /// Time a delivered message stays invisible before it is redelivered
    pub ack_wait: Duration,
    /// Delivery attempts before a failing message is dead-lettered
    pub max_deliver: u64,
}

/// Back-off before an exhausted message whose dead letter publish failed is tried again
pub const DEAD_LETTER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Delivery limit handed to the server.
///
/// With a dead letter sink the consumer enforces `max_deliver` itself and the
/// server limit is lifted (-1), so a message whose park failed is still redelivered.
fn server_max_deliver(settings: &ConsumerSettings, has_dead_letter: bool) -> i64 {
    if has_dead_letter {
        -1
    } else {
        settings.max_deliver as i64
    }
}

/// Where exhausted messages are parked for manual inspection
pub struct DeadLetterSink {
    publisher: Arc<dyn JetStreamPublisher>,
    stream_name: String,
}

impl DeadLetterSink {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>, stream_name: String) -> Self {
        Self {
            publisher,
            stream_name,
        }
    }

    /// `{dlq_stream}.{last token of the original subject}`
    ///
    /// Producers escape the tenant into a single token (see [`subject_token`]),
    /// so the last token is the whole tenant.
    ///
    /// [`subject_token`]: crate::nats::subject_token
    pub fn subject_for(&self, original_subject: &str) -> String {
        let suffix = original_subject
            .rsplit('.')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown");
        format!("{}.{}", self.stream_name, suffix)
    }

    async fn publish(&self, msg: &QueueMessage, reason: Option<&str>) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(DLQ_ORIGINAL_SUBJECT_HEADER, msg.subject.as_str());
        headers.insert(DLQ_DELIVERY_COUNT_HEADER, msg.delivered.to_string().as_str());
        if let Some(reason) = reason {
            headers.insert(DLQ_REASON_HEADER, reason);
        }

        self.publisher
            .publish_with_headers(self.subject_for(&msg.subject), headers, msg.payload.clone())
            .await
    }
}

/// Generic NATS JetStream consumer that processes batches of messages
/// The consumer handles fetching messages, acknowledgments, dead-lettering and error handling
/// Message deserialization and business logic are delegated to the processor function
pub struct NatsConsumer {
    consumer: Box<dyn PullConsumer>,
    settings: ConsumerSettings,
    dead_letter: Option<DeadLetterSink>,
    processor: BatchProcessor,
}

impl NatsConsumer {
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        settings: ConsumerSettings,
        dead_letter: Option<DeadLetterSink>,
        processor: BatchProcessor,
    ) -> Result<Self> {
        debug!(
            stream = %settings.stream_name,
            consumer = %settings.consumer_name,
            subject = %settings.subject_filter,
            max_deliver = settings.max_deliver,
            ack_wait_secs = settings.ack_wait.as_secs(),
            "Creating JetStream consumer"
        );

        // Create or bind to the durable consumer
        let config = jetstream::consumer::pull::Config {
            name: Some(settings.consumer_name.clone()),
            durable_name: Some(settings.consumer_name.clone()),
            filter_subject: settings.subject_filter.clone(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ack_wait: settings.ack_wait,
            max_deliver: server_max_deliver(&settings, dead_letter.is_some()),
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, &settings.stream_name)
            .await
            .context("failed to create consumer")?;

        info!(
            stream = %settings.stream_name,
            consumer = %settings.consumer_name,
            "Consumer created successfully"
        );

        Ok(Self {
            consumer,
            settings,
            dead_letter,
            processor,
        })
    }

    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.settings.stream_name,
            consumer = %self.settings.consumer_name,
            "Starting consumer loop"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    if let Err(e) = result {
                        error!(error = %e, "Error processing batch");
                        // Continue processing despite errors
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Consumer stopped gracefully");
        Ok(())
    }

    pub(crate) async fn fetch_and_process_batch(&self) -> Result<()> {
        debug!(
            batch_size = self.settings.batch_size,
            max_wait_secs = self.settings.max_wait.as_secs(),
            "Fetching message batch"
        );

        let messages = self
            .consumer
            .fetch_messages(self.settings.batch_size, self.settings.max_wait)
            .await?;

        if messages.is_empty() {
            debug!("No messages in batch");
            return Ok(());
        }

        debug!(message_count = messages.len(), "Received message batch");

        // The processor is responsible for deserialization and business logic
        let processing_result = match (self.processor)(&messages).await {
            Ok(result) => result,
            Err(e) => {
                // If the processor returns an error, Nak all messages
                error!(error = %e, "Processor returned error, rejecting all messages");
                ProcessingResult::nak_all(messages.len(), Some(e.to_string()))
            }
        };

        self.settle(&messages, processing_result).await;
        Ok(())
    }

    async fn settle(&self, messages: &[QueueMessage], result: ProcessingResult) {
        let ack_count = result.ack.len();
        for idx in result.ack {
            match messages.get(idx) {
                Some(msg) => {
                    if let Err(e) = msg.ack().await {
                        error!(error = %e, message_index = idx, "Failed to acknowledge message");
                    }
                }
                None => warn!(
                    message_index = idx,
                    batch_size = messages.len(),
                    "Invalid ack index in ProcessingResult"
                ),
            }
        }

        if ack_count > 0 {
            debug!(ack_count, "Acknowledged messages");
        }

        let mut nak_count = 0usize;
        let mut dead_lettered = 0usize;
        for (idx, error_msg) in result.nak {
            let Some(msg) = messages.get(idx) else {
                warn!(
                    message_index = idx,
                    batch_size = messages.len(),
                    "Invalid nak index in ProcessingResult"
                );
                continue;
            };

            if let Some(ref err) = error_msg {
                warn!(
                    message_index = idx,
                    subject = %msg.subject,
                    delivered = msg.delivered,
                    error = %err,
                    "Rejecting message due to processing error"
                );
            } else {
                warn!(
                    message_index = idx,
                    subject = %msg.subject,
                    delivered = msg.delivered,
                    "Rejecting message"
                );
            }

            if self.is_exhausted(msg) && self.dead_letter.is_some() {
                if self.dead_letter(msg, error_msg.as_deref()).await {
                    dead_lettered += 1;
                    continue;
                }
                if let Err(e) = msg.nak_with_delay(DEAD_LETTER_RETRY_DELAY).await {
                    error!(error = %e, message_index = idx, "Failed to reject message");
                }
                nak_count += 1;
                continue;
            }

            if let Err(e) = msg.nak().await {
                error!(error = %e, message_index = idx, "Failed to reject message");
            }
            nak_count += 1;
        }

        if nak_count > 0 {
            debug!(nak_count, "Rejected messages for redelivery");
        }
        if dead_lettered > 0 {
            warn!(dead_lettered, "Moved exhausted messages to dead letter stream");
        }
    }

    fn is_exhausted(&self, msg: &QueueMessage) -> bool {
        self.settings.max_deliver > 0 && msg.delivered >= self.settings.max_deliver
    }

    /// Returns true when the message was parked and terminated
    async fn dead_letter(&self, msg: &QueueMessage, reason: Option<&str>) -> bool {
        let Some(sink) = &self.dead_letter else {
            return false;
        };

        if let Err(e) = sink.publish(msg, reason).await {
            error!(
                subject = %msg.subject,
                error = %e,
                retry_delay_secs = DEAD_LETTER_RETRY_DELAY.as_secs(),
                "Failed to publish to dead letter stream, message will be redelivered"
            );
            return false;
        }

        if let Err(e) = msg.term().await {
            error!(subject = %msg.subject, error = %e, "Failed to terminate dead-lettered message");
        }

        error!(
            subject = %msg.subject,
            dead_letter_subject = %sink.subject_for(&msg.subject),
            delivered = msg.delivered,
            "Message exceeded max deliveries, moved to dead letter stream"
        );
        true
    }
}
