//! Report Data Structures

use crate::unit::TimeUnit;
use chrono::{DateTime, Utc};
use mapbench_stats::Statistics;
use serde::{Deserialize, Serialize};

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// One entry per (benchmark, mode), in plan order
    pub results: Vec<BenchmarkModeResult>,
    /// Every failed trial, in the order it happened
    pub failures: Vec<FailureInfo>,
    /// Totals
    pub summary: ReportSummary,
}

impl Report {
    /// Result for one benchmark in one mode
    pub fn result(&self, benchmark: &str, mode: &str) -> Option<&BenchmarkModeResult> {
        self.results
            .iter()
            .find(|r| r.benchmark == benchmark && r.mode == mode)
    }

    /// Whether any trial failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Layout version of this document
    pub schema_version: u32,
    /// Harness version
    pub version: String,
    /// When the run started
    pub timestamp: DateTime<Utc>,
    /// Host the run executed on
    pub system: SystemInfo,
    /// Effective configuration
    pub config: ReportConfig,
}

/// System information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name
    pub cpu: String,
    /// Available cores
    pub cpu_cores: u32,
    /// Total memory in GB
    pub memory_gb: f64,
}

/// Execution configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Trials per (benchmark, mode)
    pub forks: u32,
    /// Discarded iterations per trial
    pub warmup_iterations: u32,
    /// Recorded iterations per trial
    pub measurement_iterations: u32,
    /// Selected mode (`all` or one mode)
    pub mode: String,
    /// Wall-clock iteration length
    pub iteration_time_ns: u64,
    /// Invocations per `AverageTime` iteration
    pub invocations_per_iteration: u64,
    /// Concurrent lanes per trial
    pub threads: usize,
    /// Seed for fixture random streams
    pub random_seed: i64,
    /// Requested heap size; recorded only
    pub heap_size_hint_bytes: u64,
    /// Wall-clock ceiling per trial
    pub trial_timeout_ns: u64,
    /// Unit of reported statistics
    pub time_unit: TimeUnit,
    /// Entries per workload
    pub entries: usize,
    /// Scan cut-off value
    pub scan_threshold: i64,
}

/// Statistics for one (benchmark, mode); non-finite values are `None`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeMetrics {
    /// Aggregated values
    pub samples: usize,
    /// Mean
    pub mean: Option<f64>,
    /// Minimum
    pub min: Option<f64>,
    /// Maximum
    pub max: Option<f64>,
    /// Median
    pub p50: Option<f64>,
    /// 90th percentile
    pub p90: Option<f64>,
    /// 99th percentile
    pub p99: Option<f64>,
    /// Population standard deviation
    pub std_dev: Option<f64>,
    /// Standard deviation as a percentage of the mean
    #[serde(default)]
    pub cv_percent: Option<f64>,
}

impl ModeMetrics {
    /// Convert statistics, multiplying every value by `factor`
    pub fn scaled(stats: &Statistics, factor: f64) -> Self {
        let scale = |v: f64| {
            let scaled = v * factor;
            scaled.is_finite().then_some(scaled)
        };
        Self {
            samples: stats.sample_count,
            mean: scale(stats.mean),
            min: scale(stats.min),
            max: scale(stats.max),
            p50: scale(stats.p50),
            p90: scale(stats.p90),
            p99: scale(stats.p99),
            std_dev: scale(stats.std_dev),
            cv_percent: (!stats.is_no_data()).then(|| stats.coefficient_of_variation()),
        }
    }
}

/// Outcome for one benchmark in one mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkModeResult {
    /// Benchmark name
    pub benchmark: String,
    /// Benchmark group
    pub group: String,
    /// Mode identifier (`thrpt`, `avgt`, `sample`, `ss`)
    pub mode: String,
    /// Unit label of the metrics (`ms/op`, `ops/ms`, ...)
    pub unit: String,
    /// Forks that produced a result set
    pub forks_completed: u32,
    /// Forks that failed and were excluded
    pub forks_failed: u32,
    /// Statistics over every completed fork
    pub metrics: ModeMetrics,
}

/// One failed trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// Benchmark name
    pub benchmark: String,
    /// Mode identifier
    pub mode: String,
    /// Fork index, if the failure belongs to one trial
    pub fork: Option<u32>,
    /// `setup_error`, `benchmark_failure` or `trial_timeout`
    pub kind: String,
    /// Rendered cause
    pub message: String,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// (benchmark, mode) pairs planned
    pub plan_entries: usize,
    /// Trials started
    pub trials_run: usize,
    /// Trials that ended without a result set
    pub trials_failed: usize,
    /// (benchmark, mode) pairs left without any sample
    pub results_without_data: usize,
    /// Wall-clock length of the run
    pub total_duration_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::{SCHEMA_VERSION, generate_json_report};
    use mapbench_stats::aggregate;

    fn report(metrics: ModeMetrics) -> Report {
        Report {
            meta: ReportMeta {
                schema_version: SCHEMA_VERSION,
                version: "0.1.0".to_string(),
                timestamp: Utc::now(),
                system: SystemInfo::default(),
                config: ReportConfig {
                    forks: 1,
                    warmup_iterations: 1,
                    measurement_iterations: 3,
                    mode: "all".to_string(),
                    iteration_time_ns: 1_000_000_000,
                    invocations_per_iteration: 1,
                    threads: 1,
                    random_seed: 42,
                    heap_size_hint_bytes: 2 << 30,
                    trial_timeout_ns: 600_000_000_000,
                    time_unit: TimeUnit::Ms,
                    entries: 10_000,
                    scan_threshold: 10_000,
                },
            },
            results: vec![BenchmarkModeResult {
                benchmark: "put/std-hashmap".to_string(),
                group: "put".to_string(),
                mode: "avgt".to_string(),
                unit: TimeUnit::Ms.metric_label(false),
                forks_completed: 1,
                forks_failed: 0,
                metrics,
            }],
            failures: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    #[test]
    fn test_scaled_metrics() {
        let stats = aggregate(&[1_000_000.0, 3_000_000.0]);
        let metrics = ModeMetrics::scaled(&stats, TimeUnit::Ms.duration_factor());
        assert_eq!(metrics.samples, 2);
        assert!((metrics.mean.unwrap() - 2.0).abs() < 1e-12);
        assert!((metrics.std_dev.unwrap() - 1.0).abs() < 1e-12);
        assert!((metrics.cv_percent.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_data_serializes_as_null() {
        let metrics = ModeMetrics::scaled(&Statistics::no_data(), 1.0);
        assert_eq!(metrics.samples, 0);
        assert!(metrics.mean.is_none());
        assert!(metrics.cv_percent.is_none());

        let json = generate_json_report(&report(metrics)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value["results"][0]["metrics"];
        assert_eq!(entry["samples"], 0);
        assert!(entry["mean"].is_null());
        assert!(entry["p99"].is_null());
        assert_eq!(value["meta"]["config"]["time_unit"], "ms");
    }

    #[test]
    fn test_lookup_by_benchmark_and_mode() {
        let report = report(ModeMetrics::default());
        assert!(report.result("put/std-hashmap", "avgt").is_some());
        assert!(report.result("put/std-hashmap", "thrpt").is_none());
        assert!(!report.has_failures());
    }
}
