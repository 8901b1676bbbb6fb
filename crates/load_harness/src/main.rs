use load_harness::{
    DriverSettings, LoadTestConfig, RequestDriver, RequestGenerator, RequestOutcome,
    ReqwestIngestClient, StatsCollector, format_run_header, format_stats, format_throughput,
};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        error!("Load test failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = LoadTestConfig::from_env()?;
    let tenants = config.tenant_list();
    anyhow::ensure!(!tenants.is_empty(), "LOADGEN_TENANTS must name at least one tenant");

    info!(endpoint = %config.api_endpoint, concurrency = config.concurrency, "Loaded configuration");

    let client = Arc::new(ReqwestIngestClient::new(
        &config.api_endpoint,
        config.request_timeout(),
    )?);
    let stats = Arc::new(StatsCollector::new());
    let driver = RequestDriver::new(client, Arc::new(RequestGenerator::new(tenants)), stats.clone())
        .with_progress(Arc::new(print_progress));

    // Ctrl-C prints whatever has been collected and exits cleanly
    let interrupted_stats = stats.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n\nInterrupted. Final stats:");
            println!("{}", format_stats(&interrupted_stats.snapshot()));
            std::process::exit(0);
        }
    });

    println!("Warming up ingest service...");
    driver
        .warmup(config.warmup_requests, config.warmup_stagger(), None)
        .await;
    println!("Warmup complete ({} requests)\n", config.warmup_requests);

    println!(
        "Waiting {} seconds for workers to finish processing warmup messages...",
        config.warmup_settle_secs
    );
    tokio::time::sleep(config.warmup_settle()).await;

    // Warmup must not skew the measured numbers
    stats.reset();

    println!("{}", format_run_header(&config));

    let summary = driver
        .run(
            &DriverSettings {
                concurrency: config.concurrency,
                duration: config.duration(),
                seed: None,
            },
            CancellationToken::new(),
        )
        .await;

    println!("\n\nTest duration reached, in-flight requests drained.\n");
    println!("{}", format_throughput(&summary));
    println!("{}", format_stats(&stats.snapshot()));

    Ok(())
}

fn print_progress(outcome: &RequestOutcome) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(if outcome.is_success() { b"." } else { b"X" });
    let _ = stdout.flush();
}
