//! Report Building
//!
//! Combines execution results, their statistics and the run settings into
//! the final report. Statistics are scaled from base units (nanoseconds,
//! operations per second) into the configured output unit here.

use super::execution::ExecutionOutcome;
use super::metadata::build_report_meta;
use crate::config::RunSettings;
use chrono::{DateTime, Utc};
use mapbench_report::{BenchmarkModeResult, FailureInfo, ModeMetrics, Report, ReportSummary};
use mapbench_stats::Statistics;

/// Build a complete Report from execution results
///
/// `stats` must be parallel to `outcome.results`, as returned by
/// [`compute_statistics`](super::compute_statistics).
pub fn build_report(
    outcome: &ExecutionOutcome,
    stats: &[Statistics],
    settings: &RunSettings,
    plan_entries: usize,
    started_at: DateTime<Utc>,
    total_duration_ms: f64,
) -> Report {
    let unit = settings.time_unit;

    let results: Vec<BenchmarkModeResult> = outcome
        .results
        .iter()
        .zip(stats)
        .map(|(result, stats)| {
            let is_rate = result.mode.is_rate();
            let factor = if is_rate {
                unit.rate_factor()
            } else {
                unit.duration_factor()
            };
            BenchmarkModeResult {
                benchmark: result.benchmark.to_string(),
                group: result.group.clone(),
                mode: result.mode.to_string(),
                unit: unit.metric_label(is_rate),
                forks_completed: result.forks_completed,
                forks_failed: result.forks_failed,
                metrics: ModeMetrics::scaled(stats, factor),
            }
        })
        .collect();

    let failures: Vec<FailureInfo> = outcome
        .failures
        .iter()
        .map(|f| FailureInfo {
            benchmark: f.benchmark.to_string(),
            mode: f.mode.to_string(),
            fork: Some(f.fork),
            kind: f.error.kind().to_string(),
            message: f.error.to_string(),
        })
        .collect();

    let summary = ReportSummary {
        plan_entries,
        trials_run: outcome.trials_run,
        trials_failed: outcome.failures.len(),
        results_without_data: results.iter().filter(|r| r.metrics.samples == 0).count(),
        total_duration_ms,
    };

    Report {
        meta: build_report_meta(settings, started_at),
        results,
        failures,
        summary,
    }
}
