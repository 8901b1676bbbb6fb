use crate::request::IngestPayload;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Classified result of a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 2xx response
    Accepted { status: u16 },
    /// Non-2xx response or transport failure, labelled for the error breakdown
    Failed { error_class: String },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Accepted { .. })
    }

    pub fn error_class(&self) -> Option<&str> {
        match self {
            RequestOutcome::Accepted { .. } => None,
            RequestOutcome::Failed { error_class } => Some(error_class),
        }
    }

    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            RequestOutcome::Accepted { status }
        } else {
            RequestOutcome::Failed {
                error_class: format!("HTTP_{}", status),
            }
        }
    }
}

/// Sends ingest requests to the system under test
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngestClient: Send + Sync {
    /// Never fails: transport problems come back as `RequestOutcome::Failed`
    async fn send(&self, payload: &IngestPayload) -> RequestOutcome;
}

pub struct ReqwestIngestClient {
    client: reqwest::Client,
    ingest_url: String,
}

impl ReqwestIngestClient {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            ingest_url: format!("{}/ingest", endpoint.trim_end_matches('/')),
        })
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }
}

#[async_trait]
impl IngestClient for ReqwestIngestClient {
    async fn send(&self, payload: &IngestPayload) -> RequestOutcome {
        let mut request = self
            .client
            .post(&self.ingest_url)
            .header(CONTENT_TYPE, payload.content_type())
            .body(payload.body());
        if let IngestPayload::RawText { tenant_id, .. } = payload {
            request = request.header(TENANT_ID_HEADER, tenant_id.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "ingest request failed");
                return RequestOutcome::Failed {
                    error_class: classify_error(&e).to_string(),
                };
            }
        };

        let status = response.status().as_u16();
        // Latency covers the full response body
        if let Err(e) = response.bytes().await {
            debug!(error = %e, status, "failed to read ingest response body");
            return RequestOutcome::Failed {
                error_class: classify_error(&e).to_string(),
            };
        }

        RequestOutcome::from_status(status)
    }
}

/// Label for a transport-level failure
pub fn classify_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "TIMEOUT"
    } else if error.is_connect() {
        "CONNECTION_ERROR"
    } else if error.is_body() || error.is_decode() {
        "BODY_ERROR"
    } else if error.is_request() {
        "REQUEST_ERROR"
    } else {
        "UNKNOWN_ERROR"
    }
}
