use crate::domain::{
    BatchFailurePolicy, BatchWorker, LogProcessingService, ProcessingSettings, TextTransformer,
};
use crate::nats::create_log_envelope_processor;
use common::domain::LogRecordRepository;
use common::nats::{ConsumerSettings, DeadLetterSink, JetStreamConsumer, NatsConsumer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct LogWorkerConfig {
    pub consumer: ConsumerSettings,
    pub processing: ProcessingSettings,
    pub failure_policy: BatchFailurePolicy,
}

pub struct LogWorker {
    consumer: NatsConsumer,
}

impl LogWorker {
    pub async fn new(
        repository: Arc<dyn LogRecordRepository>,
        transformer: Arc<dyn TextTransformer>,
        jetstream: Arc<dyn JetStreamConsumer>,
        dead_letter: Option<DeadLetterSink>,
        config: LogWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!(
            failure_policy = %config.failure_policy,
            crash_simulation = config.processing.fault_injection.enabled,
            "Initializing Log Worker module"
        );

        let service = Arc::new(LogProcessingService::new(
            repository,
            transformer,
            config.processing,
        ));
        let worker = Arc::new(BatchWorker::new(service));
        let processor = create_log_envelope_processor(worker, config.failure_policy);

        let consumer = NatsConsumer::new(jetstream, config.consumer, dead_letter, processor).await?;

        info!("Log Worker initialized");

        Ok(Self { consumer })
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        let consumer = self.consumer;
        move |ctx| Box::pin(async move { consumer.run(ctx).await })
    }
}
