use crate::config::LoadTestConfig;
use crate::driver::RunSummary;
use crate::stats::StatsSnapshot;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Settings banner printed before the measured phase
pub fn format_run_header(config: &LoadTestConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Starting load test...");
    let _ = writeln!(out, "Endpoint:          {}", config.api_endpoint);
    let _ = writeln!(out, "Duration:          {} minute(s)", config.duration_minutes);
    let _ = writeln!(out, "Test Concurrency:  {}", config.concurrency);
    let _ = writeln!(
        out,
        "Mode:              Max throughput (target {} req/min is informational)",
        config.requests_per_minute
    );
    let _ = writeln!(
        out,
        "Crash simulation:  {}",
        if config.crash_simulation { "on" } else { "off" }
    );
    let _ = writeln!(out, "Tenants:           {}", config.tenant_list().join(", "));
    out
}

pub fn format_throughput(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "MAX THROUGHPUT TEST RESULTS");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(
        out,
        "Actual Duration:   {:.2}s",
        summary.elapsed.as_secs_f64()
    );
    let _ = writeln!(
        out,
        "Throughput:        {:.2} req/s ({:.0} req/min)",
        summary.throughput_per_second(),
        summary.throughput_per_minute()
    );
    out
}

pub fn format_stats(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "LOAD TEST STATISTICS");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Total Requests:    {}", snapshot.total);
    let _ = writeln!(
        out,
        "Successful:        {} ({:.2}%)",
        snapshot.success,
        snapshot.success_rate()
    );
    let _ = writeln!(
        out,
        "Failed:            {} ({:.2}%)",
        snapshot.errors,
        snapshot.error_rate()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Latency (ms):");
    let _ = writeln!(out, "  Min:             {}", snapshot.min_ms);
    let _ = writeln!(out, "  Max:             {}", snapshot.max_ms);
    let _ = writeln!(out, "  P50:             {}", snapshot.p50_ms);
    let _ = writeln!(out, "  P95:             {}", snapshot.p95_ms);
    let _ = writeln!(out, "  P99:             {}", snapshot.p99_ms);
    let _ = writeln!(out, "  Avg:             {:.2}", snapshot.mean_ms);

    if !snapshot.error_breakdown.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error Breakdown:");
        for (class, count) in &snapshot.error_breakdown {
            let _ = writeln!(out, "  {}: {}", class, count);
        }
    }
    let _ = writeln!(out, "{}", rule());
    out
}
