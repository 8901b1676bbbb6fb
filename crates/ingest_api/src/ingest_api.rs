use crate::domain::IngestService;
use crate::http::{AppState, HttpServerConfig, build_router, run_http_server};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct IngestApi {
    service: Arc<IngestService>,
    config: HttpServerConfig,
}

impl IngestApi {
    pub fn new(service: Arc<IngestService>, config: HttpServerConfig) -> Self {
        debug!("Initializing Ingest API module");
        Self { service, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                let router = build_router(AppState::new(self.service));
                run_http_server(self.config, router, ctx).await
            })
        }
    }
}
