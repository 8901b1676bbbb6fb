use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Load test settings, read from `LOADGEN_*` environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoadTestConfig {
    /// Base URL of the ingest service; `/ingest` is appended
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Target rate; informational only, the driver runs at max throughput
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u64,

    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u64,

    /// Maximum requests in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Whether the worker under test runs with crash simulation; reported only
    #[serde(default)]
    pub crash_simulation: bool,

    #[serde(default = "default_warmup_requests")]
    pub warmup_requests: usize,

    #[serde(default = "default_warmup_stagger_ms")]
    pub warmup_stagger_ms: u64,

    /// Pause after warmup so the worker can drain warmup messages
    #[serde(default = "default_warmup_settle_secs")]
    pub warmup_settle_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Comma separated tenant ids
    #[serde(default = "default_tenants")]
    pub tenants: String,
}

fn default_api_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_requests_per_minute() -> u64 {
    1000
}

fn default_duration_minutes() -> u64 {
    1
}

fn default_concurrency() -> usize {
    2
}

fn default_warmup_requests() -> usize {
    10
}

fn default_warmup_stagger_ms() -> u64 {
    100
}

fn default_warmup_settle_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_tenants() -> String {
    "acme_corp,beta_inc,gamma_ltd,delta_co,epsilon_org".to_string()
}

impl LoadTestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("LOADGEN"))
            .build()?
            .try_deserialize()
    }

    pub fn tenant_list(&self) -> Vec<String> {
        self.tenants
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_minutes * 60)
    }

    pub fn warmup_stagger(&self) -> Duration {
        Duration::from_millis(self.warmup_stagger_ms)
    }

    pub fn warmup_settle(&self) -> Duration {
        Duration::from_secs(self.warmup_settle_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("LOADGEN_CONCURRENCY");
            std::env::remove_var("LOADGEN_TENANTS");
        }

        let config = LoadTestConfig::from_env().unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.warmup_requests, 10);
        assert_eq!(config.duration(), Duration::from_secs(60));
        assert_eq!(config.tenant_list().len(), 5);
        assert!(!config.crash_simulation);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::set_var("LOADGEN_CONCURRENCY", "16");
            std::env::set_var("LOADGEN_TENANTS", "acme, beta ,");
        }

        let config = LoadTestConfig::from_env().unwrap();
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.tenant_list(), vec!["acme", "beta"]);

        // SAFETY: Test runs with mutex lock to prevent concurrent env access
        unsafe {
            std::env::remove_var("LOADGEN_CONCURRENCY");
            std::env::remove_var("LOADGEN_TENANTS");
        }
    }
}
