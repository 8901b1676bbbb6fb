use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Configuration for the HTTP listener.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl HttpServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serve `router` until the cancellation token fires, then drain in-flight requests
pub async fn run_http_server(
    config: HttpServerConfig,
    router: Router,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!(address = %address, "Starting HTTP server");

    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        debug!("HTTP server shutdown signal received");
    });

    match serve.await {
        Ok(_) => {
            debug!("HTTP server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("HTTP server error: {}", e);
            Err(e.into())
        }
    }
}
