use crate::client::{IngestClient, RequestOutcome};
use crate::request::RequestGenerator;
use crate::stats::StatsCollector;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Called after every completed request with its outcome
pub type ProgressCallback = Arc<dyn Fn(&RequestOutcome) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Maximum requests in flight
    pub concurrency: usize,
    /// No request starts after this much time has passed
    pub duration: Duration,
    /// Seed for per-worker randomness; `None` draws from OS entropy
    pub seed: Option<u64>,
}

/// Totals of a measured phase
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub total_requests: u64,
}

impl RunSummary {
    pub fn throughput_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_requests as f64 / secs
        }
    }

    pub fn throughput_per_minute(&self) -> f64 {
        self.throughput_per_second() * 60.0
    }
}

/// Keeps a fixed number of requests in flight against the ingest endpoint
pub struct RequestDriver {
    client: Arc<dyn IngestClient>,
    generator: Arc<RequestGenerator>,
    stats: Arc<StatsCollector>,
    progress: Option<ProgressCallback>,
}

impl RequestDriver {
    pub fn new(
        client: Arc<dyn IngestClient>,
        generator: Arc<RequestGenerator>,
        stats: Arc<StatsCollector>,
    ) -> Self {
        Self {
            client,
            generator,
            stats,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    /// Fire `count` requests, starting one every `stagger`, and wait for all of them
    pub async fn warmup(&self, count: usize, stagger: Duration, seed: Option<u64>) {
        info!(count, stagger_ms = stagger.as_millis() as u64, "Starting warmup");

        let mut rng = new_rng(seed, usize::MAX);
        let mut in_flight = JoinSet::new();
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(stagger).await;
            }
            let payload = self.generator.generate(&mut rng, Utc::now());
            let client = self.client.clone();
            let stats = self.stats.clone();
            in_flight.spawn(async move {
                let started = Instant::now();
                let outcome = client.send(&payload).await;
                stats.record(started.elapsed(), outcome.error_class());
            });
        }

        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "warmup request panicked");
            }
        }

        info!(count, "Warmup complete");
    }

    /// Run the measured phase until `settings.duration` elapses or `cancel` fires,
    /// then wait for in-flight requests to finish
    pub async fn run(&self, settings: &DriverSettings, cancel: CancellationToken) -> RunSummary {
        let concurrency = settings.concurrency.max(1);
        let started = Instant::now();
        let deadline = started + settings.duration;

        info!(
            concurrency,
            duration_secs = settings.duration.as_secs(),
            "Starting measured phase"
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency {
            let client = self.client.clone();
            let generator = self.generator.clone();
            let stats = self.stats.clone();
            let progress = self.progress.clone();
            let cancel = cancel.clone();
            let mut rng = new_rng(settings.seed, worker_id);

            workers.spawn(async move {
                let mut issued = 0u64;
                // Checked only between requests so in-flight work always completes
                while !cancel.is_cancelled() && Instant::now() < deadline {
                    let payload = generator.generate(&mut rng, Utc::now());
                    let request_started = Instant::now();
                    let outcome = client.send(&payload).await;
                    stats.record(request_started.elapsed(), outcome.error_class());
                    if let Some(progress) = &progress {
                        progress(&outcome);
                    }
                    issued += 1;
                }
                debug!(worker_id, issued, "worker drained");
            });
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "load worker panicked");
            }
        }

        let summary = RunSummary {
            elapsed: started.elapsed(),
            total_requests: self.stats.total(),
        };

        info!(
            total_requests = summary.total_requests,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Measured phase complete"
        );

        summary
    }
}

fn new_rng(seed: Option<u64>, worker_id: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker_id as u64)),
        None => StdRng::from_entropy(),
    }
}
