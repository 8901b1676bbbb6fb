mod config;

use common::clickhouse::ClickHouseClient;
use common::domain::{LogRecordRepository, XidLogIdGenerator};
use common::nats::{ConsumerSettings, DeadLetterSink, NatsClient};
use common::telemetry::{TelemetryConfig, TelemetryProviders, init_telemetry, shutdown_telemetry};
use config::{ServiceConfig, StoreBackend};
use ingest_api::http::HttpServerConfig;
use ingest_api::nats::NatsEnvelopeProducer;
use ingest_api::{IngestApi, IngestService};
use log_worker::{
    BatchFailurePolicy, ClickHouseLogRecordRepository, FaultInjectionConfig, IdentityTransformer,
    InMemoryLogRecordRepository, LogWorker, LogWorkerConfig, ProcessingSettings,
};
use logflow_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize telemetry (tracing + OpenTelemetry for traces and logs)
    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        store_backend = ?config.store_backend,
        "Starting logflow-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let failure_policy = match config.batch_failure_policy.parse::<BatchFailurePolicy>() {
        Ok(policy) => policy,
        Err(e) => {
            error!("Invalid batch failure policy: {}", e);
            std::process::exit(1);
        }
    };

    let nats_client = match connect_nats(&config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize NATS: {}", e);
            std::process::exit(1);
        }
    };

    let repository = match create_repository(&config).await {
        Ok(repository) => repository,
        Err(e) => {
            error!("Failed to initialize log record store: {}", e);
            std::process::exit(1);
        }
    };

    // Ingest API
    let producer = Arc::new(NatsEnvelopeProducer::new(
        nats_client.create_publisher_client(),
        config.nats_stream.clone(),
    ));
    let ingest_service = Arc::new(IngestService::new(producer, Arc::new(XidLogIdGenerator)));
    let ingest_api = IngestApi::new(
        ingest_service,
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    // Log worker
    if config.crash_simulation {
        warn!(
            marker_log_id = %config.crash_marker_log_id,
            "Crash simulation enabled, matching envelopes will always fail"
        );
    }
    let worker_config = LogWorkerConfig {
        consumer: ConsumerSettings {
            stream_name: config.nats_stream.clone(),
            consumer_name: config.nats_consumer_name.clone(),
            subject_filter: config.nats_subject.clone(),
            batch_size: config.nats_batch_size,
            max_wait: config.nats_batch_wait(),
            ack_wait: config.nats_ack_wait(),
            max_deliver: config.nats_max_deliver,
        },
        processing: ProcessingSettings {
            cost_per_char: config.processing_cost_per_char(),
            fault_injection: FaultInjectionConfig {
                enabled: config.crash_simulation,
                marker_log_id: config.crash_marker_log_id.clone(),
            },
        },
        failure_policy,
    };
    let dead_letter = DeadLetterSink::new(
        nats_client.create_publisher_client(),
        config.nats_dlq_stream.clone(),
    );
    let log_worker = match LogWorker::new(
        repository,
        Arc::new(IdentityTransformer),
        nats_client.create_consumer_client(),
        Some(dead_letter),
        worker_config,
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to create log worker: {}", e);
            std::process::exit(1);
        }
    };

    let runner = Runner::new()
        .with_named_process("ingest_api", ingest_api.into_runner_process())
        .with_named_process("log_worker", log_worker.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            nats_client.close().await;
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

async fn connect_nats(config: &ServiceConfig) -> anyhow::Result<NatsClient> {
    let client = NatsClient::connect(&config.nats_url, config.startup_timeout()).await?;
    client
        .ensure_stream(&config.nats_stream, "Accepted log envelopes awaiting processing")
        .await?;
    client
        .ensure_stream(
            &config.nats_dlq_stream,
            "Log envelopes that exhausted their delivery attempts",
        )
        .await?;
    Ok(client)
}

async fn create_repository(config: &ServiceConfig) -> anyhow::Result<Arc<dyn LogRecordRepository>> {
    match config.store_backend {
        StoreBackend::Clickhouse => {
            let client = ClickHouseClient::new(
                &config.clickhouse_url,
                &config.clickhouse_database,
                &config.clickhouse_username,
                &config.clickhouse_password,
            );
            client.ping().await?;

            let repository =
                ClickHouseLogRecordRepository::new(client, config.clickhouse_table.clone());
            repository.ensure_table().await?;
            Ok(Arc::new(repository))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory log record store, records are lost on shutdown");
            Ok(Arc::new(InMemoryLogRecordRepository::new()))
        }
    }
}
