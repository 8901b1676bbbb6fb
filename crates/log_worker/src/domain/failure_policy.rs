use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How a batch with some failed envelopes is reported back to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Any failure rejects every message in the batch, so successes are redelivered too
    #[default]
    WholeBatch,
    /// Acknowledge successes and reject only the failed messages
    PerEnvelope,
}

impl BatchFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchFailurePolicy::WholeBatch => "whole_batch",
            BatchFailurePolicy::PerEnvelope => "per_envelope",
        }
    }
}

impl fmt::Display for BatchFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "whole_batch" => Ok(BatchFailurePolicy::WholeBatch),
            "per_envelope" => Ok(BatchFailurePolicy::PerEnvelope),
            other => Err(format!("unknown batch failure policy: {}", other)),
        }
    }
}

/// Test hook that fails processing for one distinguished log id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultInjectionConfig {
    pub enabled: bool,
    pub marker_log_id: String,
}

impl Default for FaultInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            marker_log_id: "crash-test".to_string(),
        }
    }
}

impl FaultInjectionConfig {
    pub fn enabled(marker_log_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            marker_log_id: marker_log_id.into(),
        }
    }

    pub fn should_fail(&self, log_id: &str) -> bool {
        self.enabled && log_id == self.marker_log_id
    }
}
