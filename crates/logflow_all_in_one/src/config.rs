use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backing store for processed log records
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Clickhouse,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // HTTP configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream holding accepted envelopes
    #[serde(default = "default_nats_stream")]
    pub nats_stream: String,

    /// Subject pattern for the worker's consumer filter
    #[serde(default = "default_nats_subject")]
    pub nats_subject: String,

    /// Stream receiving envelopes that exhausted their deliveries
    #[serde(default = "default_nats_dlq_stream")]
    pub nats_dlq_stream: String,

    #[serde(default = "default_nats_consumer_name")]
    pub nats_consumer_name: String,

    /// Maximum messages per fetched batch
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Maximum time to wait for a batch to fill
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Visibility timeout of an unacknowledged delivery
    #[serde(default = "default_nats_ack_wait_secs")]
    pub nats_ack_wait_secs: u64,

    /// Deliveries before a message moves to the dead letter stream
    #[serde(default = "default_nats_max_deliver")]
    pub nats_max_deliver: u64,

    /// Timeout for connecting to NATS at startup
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Store configuration
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,

    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    #[serde(default = "default_clickhouse_table")]
    pub clickhouse_table: String,

    // Worker configuration
    /// Simulated processing cost per character of log text
    #[serde(default = "default_processing_cost_per_char_ms")]
    pub processing_cost_per_char_ms: u64,

    /// Fail every envelope whose log id equals `crash_marker_log_id`
    #[serde(default)]
    pub crash_simulation: bool,

    #[serde(default = "default_crash_marker_log_id")]
    pub crash_marker_log_id: String,

    /// `whole_batch` or `per_envelope`
    #[serde(default = "default_batch_failure_policy")]
    pub batch_failure_policy: String,

    // OpenTelemetry configuration
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_stream() -> String {
    "log_envelopes".to_string()
}

fn default_nats_subject() -> String {
    "log_envelopes.*".to_string()
}

fn default_nats_dlq_stream() -> String {
    "log_envelopes_dlq".to_string()
}

fn default_nats_consumer_name() -> String {
    "log-worker".to_string()
}

fn default_nats_batch_size() -> usize {
    10
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_nats_ack_wait_secs() -> u64 {
    30
}

fn default_nats_max_deliver() -> u64 {
    3
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Clickhouse
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "default".to_string()
}

fn default_clickhouse_username() -> String {
    "default".to_string()
}

fn default_clickhouse_password() -> String {
    String::new()
}

fn default_clickhouse_table() -> String {
    "log_records".to_string()
}

fn default_processing_cost_per_char_ms() -> u64 {
    50
}

fn default_crash_marker_log_id() -> String {
    "crash-test".to_string()
}

fn default_batch_failure_policy() -> String {
    "whole_batch".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "logflow".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("LOGFLOW"))
            .build()?
            .try_deserialize()
    }

    pub fn nats_batch_wait(&self) -> Duration {
        Duration::from_secs(self.nats_batch_wait_secs)
    }

    pub fn nats_ack_wait(&self) -> Duration {
        Duration::from_secs(self.nats_ack_wait_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn processing_cost_per_char(&self) -> Duration {
        Duration::from_millis(self.processing_cost_per_char_ms)
    }
}
