use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Value at the ceiling-index rank: `sorted[ceil(n * p / 100) - 1]`, 0 when empty
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((sorted.len() as f64 * p) / 100.0).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Default)]
struct StatsState {
    total: u64,
    success: u64,
    errors: u64,
    latencies_ms: Vec<u64>,
    error_types: BTreeMap<String, u64>,
}

/// Point-in-time view of the collected statistics
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub mean_ms: f64,
    pub error_breakdown: BTreeMap<String, u64>,
}

impl StatsSnapshot {
    pub fn success_rate(&self) -> f64 {
        rate(self.success, self.total)
    }

    pub fn error_rate(&self) -> f64 {
        rate(self.errors, self.total)
    }
}

fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Request outcomes shared by every in-flight request of a run
#[derive(Debug, Default)]
pub struct StatsCollector {
    state: Mutex<StatsState>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StatsState> {
        // A panicking recorder cannot leave the counters half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one completed request; `error_class` is `None` for successes
    pub fn record(&self, latency: Duration, error_class: Option<&str>) {
        let mut state = self.state();
        state.total += 1;
        state.latencies_ms.push(latency.as_millis() as u64);
        match error_class {
            None => state.success += 1,
            Some(class) => {
                state.errors += 1;
                *state.error_types.entry(class.to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.state().total
    }

    pub fn percentile(&self, p: f64) -> u64 {
        percentile(&self.sorted_latencies(), p)
    }

    pub fn min(&self) -> u64 {
        self.state().latencies_ms.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> u64 {
        self.state().latencies_ms.iter().copied().max().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        mean(&self.state().latencies_ms)
    }

    pub fn error_breakdown(&self) -> BTreeMap<String, u64> {
        self.state().error_types.clone()
    }

    /// Discard everything recorded so far
    pub fn reset(&self) {
        *self.state() = StatsState::default();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (total, success, errors, mut latencies, error_breakdown) = {
            let state = self.state();
            (
                state.total,
                state.success,
                state.errors,
                state.latencies_ms.clone(),
                state.error_types.clone(),
            )
        };
        latencies.sort_unstable();

        StatsSnapshot {
            total,
            success,
            errors,
            min_ms: latencies.first().copied().unwrap_or(0),
            max_ms: latencies.last().copied().unwrap_or(0),
            p50_ms: percentile(&latencies, 50.0),
            p95_ms: percentile(&latencies, 95.0),
            p99_ms: percentile(&latencies, 99.0),
            mean_ms: mean(&latencies),
            error_breakdown,
        }
    }

    fn sorted_latencies(&self) -> Vec<u64> {
        let mut latencies = self.state().latencies_ms.clone();
        latencies.sort_unstable();
        latencies
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<u64>() as f64 / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn collector_with(latencies: &[u64]) -> StatsCollector {
        let stats = StatsCollector::new();
        for ms in latencies {
            stats.record(Duration::from_millis(*ms), None);
        }
        stats
    }

    #[test]
    fn test_percentile_ceiling_index() {
        let stats = collector_with(&[40, 10, 30, 20]);

        assert_eq!(stats.percentile(50.0), 20);
        assert_eq!(stats.percentile(95.0), 40);
        assert_eq!(stats.percentile(100.0), 40);
        assert_eq!(stats.percentile(25.0), 10);
    }

    #[test]
    fn test_percentile_of_empty_samples() {
        let stats = StatsCollector::new();

        assert_eq!(stats.percentile(50.0), 0);
        assert_eq!(stats.percentile(0.0), 0);
        assert_eq!(stats.min(), 0);
        assert_eq!(stats.mean(), 0.0);
    }

    #[test]
    fn test_percentile_zero_returns_smallest() {
        assert_eq!(percentile(&[5, 7, 9], 0.0), 5);
    }

    #[test]
    fn test_min_max_mean() {
        let stats = collector_with(&[10, 20, 30, 40]);

        assert_eq!(stats.min(), 10);
        assert_eq!(stats.max(), 40);
        assert_eq!(stats.mean(), 25.0);
    }

    #[test]
    fn test_error_breakdown_counts_per_class() {
        let stats = StatsCollector::new();
        stats.record(Duration::from_millis(5), None);
        stats.record(Duration::from_millis(5), Some("HTTP_500"));
        stats.record(Duration::from_millis(5), Some("HTTP_500"));
        stats.record(Duration::from_millis(5), Some("TIMEOUT"));

        let snapshot = stats.snapshot();

        assert_eq!(snapshot.total, 4);
        assert_eq!(snapshot.success, 1);
        assert_eq!(snapshot.errors, 3);
        assert_eq!(snapshot.error_breakdown.get("HTTP_500"), Some(&2));
        assert_eq!(snapshot.error_breakdown.get("TIMEOUT"), Some(&1));
        assert_eq!(snapshot.success_rate(), 25.0);
    }

    #[test]
    fn test_reset_discards_samples() {
        let stats = collector_with(&[10, 20]);
        stats.record(Duration::from_millis(1), Some("HTTP_503"));

        stats.reset();

        assert_eq!(stats.snapshot(), StatsCollector::new().snapshot());
    }

    #[test]
    fn test_concurrent_records_are_all_kept() {
        let stats = Arc::new(StatsCollector::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for ms in 0..100 {
                        stats.record(Duration::from_millis(ms), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.total(), 800);
        assert_eq!(stats.max(), 99);
    }
}
