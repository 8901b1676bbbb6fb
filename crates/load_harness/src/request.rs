use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::json;

pub const MESSAGE_TEMPLATES: [&str; 8] = [
    "User login failed from IP 192.168.1.100",
    "Database query executed in 45ms for table users",
    "API request to /api/v1/orders completed with status 200",
    "Cache miss for key session:abc123, fetching from database",
    "Payment processed successfully for order #12345, amount $99.99",
    "Error: Connection timeout after 30s to service payment-gateway",
    "Scheduled job cleanup-old-logs started at 03:00 UTC",
    "WebSocket connection established from client 10.0.0.50",
];

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const LOG_ID_LEN: usize = 13;
const REQUEST_ID_LEN: usize = 6;

/// One synthetic ingest request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestPayload {
    Structured {
        tenant_id: String,
        log_id: String,
        text: String,
    },
    RawText {
        tenant_id: String,
        text: String,
    },
}

impl IngestPayload {
    pub fn content_type(&self) -> &'static str {
        match self {
            IngestPayload::Structured { .. } => "application/json",
            IngestPayload::RawText { .. } => "text/plain",
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            IngestPayload::Structured { tenant_id, .. } | IngestPayload::RawText { tenant_id, .. } => {
                tenant_id
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            IngestPayload::Structured {
                tenant_id,
                log_id,
                text,
            } => json!({ "tenant_id": tenant_id, "log_id": log_id, "text": text }).to_string(),
            IngestPayload::RawText { text, .. } => text.clone(),
        }
    }
}

/// Builds random requests over a fixed tenant set; randomness comes from the caller
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    tenants: Vec<String>,
}

impl RequestGenerator {
    pub fn new(tenants: Vec<String>) -> Self {
        Self { tenants }
    }

    pub fn tenants(&self) -> &[String] {
        &self.tenants
    }

    /// Tenant, content kind (50/50) and message are drawn independently
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> IngestPayload {
        let tenant_id = self
            .tenants
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        let text = synthetic_message(rng, now);

        if rng.gen_bool(0.5) {
            IngestPayload::Structured {
                tenant_id,
                log_id: random_id(rng, LOG_ID_LEN),
                text,
            }
        } else {
            IngestPayload::RawText { tenant_id, text }
        }
    }
}

/// `[<timestamp>] [<request id>] <template>`
pub fn synthetic_message<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    let template = MESSAGE_TEMPLATES
        .choose(rng)
        .copied()
        .unwrap_or(MESSAGE_TEMPLATES[0]);
    format!(
        "[{}] [{}] {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        random_id(rng, REQUEST_ID_LEN),
        template
    )
}

/// Lowercase base-36 identifier
pub fn random_id<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
