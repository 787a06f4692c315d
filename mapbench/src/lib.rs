#![warn(missing_docs)]
//! # Mapbench
//!
//! Microbenchmark harness for comparing map implementations under
//! controlled, repeatable conditions.
//!
//! - **Trial Isolation**: every fork runs on a fresh thread with fresh fixtures
//!   and a wall-clock ceiling
//! - **Scoped Fixtures**: shared or per-lane state with hooks per trial,
//!   iteration and invocation
//! - **Four Timing Modes**: throughput, average time, sample time and single-shot time
//! - **Fail-Late**: a failing trial is reported and excluded; the rest of the run continues
//!
//! ## Quick Start
//!
//! ```ignore
//! use mapbench::{MapUnderTest, Registry, WorkloadParams, register_map};
//!
//! let mut registry = Registry::new();
//! register_map::<MyPersistentMap>(&mut registry, "my-map", WorkloadParams::default())?;
//! ```
//!
//! The bundled binary runs every workload against the standard adapters:
//!
//! ```text
//! mapbench --mode avgt --forks 2 'put/.*'
//! ```

// Re-export core types
pub use mapbench_core::{
    BenchmarkDef, Blackhole, Fixture, FixtureSeed, HookContext, HookError, HookLevels,
    ModeSelection, OperationError, Registry, RegistryError, ResultSet, Scope, TimingMode,
    TrialControl, TrialError, TrialSpec, TrialState,
};

// Re-export maps
pub use mapbench_maps::{
    MapUnderTest, STANDARD_MAPS, Workload, WorkloadParams, register_map, register_workload,
    standard_registry,
};

// Re-export stats
pub use mapbench_stats::{Statistics, aggregate};

// Re-export report
pub use mapbench_report::{OutputFormat, Report, TimeUnit, generate_json_report};

pub use mapbench_runner::{
    BenchConfig, Cli, RunSettings, Selection, WorkloadConfig, execute_run, run_with,
    run_with_cli,
};

/// Workload sizing taken from the `[workload]` configuration section
pub fn workload_params(config: &WorkloadConfig) -> WorkloadParams {
    WorkloadParams {
        entries: config.entries,
        scan_threshold: config.scan_threshold,
    }
}

/// Run the mapbench CLI over the standard adapters.
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     mapbench::run()
/// }
/// ```
pub fn run() -> anyhow::Result<()> {
    run_with(|workload| standard_registry(workload_params(workload)))
}
