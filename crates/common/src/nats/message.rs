use anyhow::Result;
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// Settles a single delivered message with the broker
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MessageAcker: Send + Sync {
    /// Processing succeeded, remove the message from the stream
    async fn ack(&self) -> Result<()>;

    /// Processing failed, make the message eligible for redelivery
    async fn nak(&self) -> Result<()>;

    /// Like `nak`, but the broker holds the message back for `delay`
    async fn nak_with_delay(&self, delay: Duration) -> Result<()>;

    /// Stop redelivering this message
    async fn term(&self) -> Result<()>;
}

/// An owned, delivered queue message plus the handle used to settle it.
///
/// Decouples batch processing from `async_nats::jetstream::Message`, which
/// cannot be built without a live server.
pub struct QueueMessage {
    /// Subject the message was published to
    pub subject: String,
    pub payload: Bytes,
    /// Optional headers (used for trace context propagation)
    pub headers: Option<HeaderMap>,
    /// How many times the broker has delivered this message, starting at 1
    pub delivered: u64,
    acker: Box<dyn MessageAcker>,
}

impl QueueMessage {
    pub fn new(
        subject: impl Into<String>,
        payload: Bytes,
        headers: Option<HeaderMap>,
        delivered: u64,
        acker: Box<dyn MessageAcker>,
    ) -> Self {
        Self {
            subject: subject.into(),
            payload,
            headers,
            delivered,
            acker,
        }
    }

    pub async fn ack(&self) -> Result<()> {
        self.acker.ack().await
    }

    pub async fn nak(&self) -> Result<()> {
        self.acker.nak().await
    }

    pub async fn nak_with_delay(&self, delay: Duration) -> Result<()> {
        self.acker.nak_with_delay(delay).await
    }

    pub async fn term(&self) -> Result<()> {
        self.acker.term().await
    }
}

impl fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueMessage")
            .field("subject", &self.subject)
            .field("payload_bytes", &self.payload.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}
