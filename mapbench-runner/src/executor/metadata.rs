//! System Metadata Collection
//!
//! Collects host information and the effective configuration for report
//! metadata. Linux-specific data (CPU model, memory) degrades to "Unknown"
//! or 0 on other platforms.

use crate::config::RunSettings;
use chrono::{DateTime, Utc};
use mapbench_report::{ReportConfig, ReportMeta, SCHEMA_VERSION, SystemInfo};

/// Build report metadata for a run that started at `timestamp`
pub fn build_report_meta(settings: &RunSettings, timestamp: DateTime<Utc>) -> ReportMeta {
    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
        memory_gb: get_memory_gb().unwrap_or(0.0),
    };

    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp,
        system,
        config: ReportConfig {
            forks: settings.forks,
            warmup_iterations: settings.warmup_iterations,
            measurement_iterations: settings.measurement_iterations,
            mode: settings.mode.to_string(),
            iteration_time_ns: settings.budget.iteration_time.as_nanos() as u64,
            invocations_per_iteration: settings.budget.invocations,
            threads: settings.threads,
            random_seed: settings.random_seed,
            heap_size_hint_bytes: settings.heap_size_hint,
            trial_timeout_ns: settings.trial_timeout.as_nanos() as u64,
            time_unit: settings.time_unit,
            entries: settings.workload.entries,
            scan_threshold: settings.workload.scan_threshold,
        },
    }
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Get total system memory in GB (Linux only)
fn get_memory_gb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("MemTotal"))
                    .and_then(|l| {
                        l.split_whitespace()
                            .nth(1)
                            .and_then(|s| s.parse::<u64>().ok())
                    })
                    .map(|kb| kb as f64 / 1024.0 / 1024.0)
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
