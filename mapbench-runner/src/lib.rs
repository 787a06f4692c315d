#![warn(missing_docs)]
//! Mapbench Runner Library
//!
//! Builds the execution plan, runs every trial in isolation under a
//! wall-clock ceiling, and turns the result sets into a report. The CLI in
//! this crate is a thin layer over [`execute_run`].
//!
//! # Example
//!
//! ```ignore
//! use mapbench_core::Registry;
//!
//! fn main() -> anyhow::Result<()> {
//!     mapbench_runner::run_with(|workload| {
//!         let mut registry = Registry::new();
//!         // register benchmarks sized by `workload`
//!         Ok(registry)
//!     })
//! }
//! ```

mod config;
mod executor;
mod planner;
mod trial;

pub use config::{
    BenchConfig, CONFIG_FILE_NAME, ConfigError, OutputConfig, RunSettings, RunnerConfig,
    WorkloadConfig, parse_bytes, parse_duration,
};
pub use executor::{
    ExecutionConfig, ExecutionOutcome, Executor, ModeExecutionResult, TrialFailure,
    build_report, build_report_meta, compute_statistics, format_human_output,
};
pub use planner::{ExecutionPlan, PlanEntry, build_plan};
pub use trial::TrialRunner;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mapbench_core::{Registry, RegistryError};
use mapbench_report::{OutputFormat, Report, generate_json_report};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Mapbench CLI arguments
#[derive(Parser, Debug, Default)]
#[command(name = "mapbench")]
#[command(author, version, about = "Mapbench - microbenchmarks for map implementations")]
pub struct Cli {
    /// Optional subcommand; defaults to running the benchmarks
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter benchmarks by regex pattern on their name
    pub filter: Option<String>,

    /// Run benchmarks for this group only
    #[arg(long)]
    pub group: Option<String>,

    /// Trials per benchmark and mode
    #[arg(long)]
    pub forks: Option<u32>,

    /// Discarded iterations per trial
    #[arg(long)]
    pub warmup_iterations: Option<u32>,

    /// Recorded iterations per trial
    #[arg(long)]
    pub measurement_iterations: Option<u32>,

    /// Timing mode: all, thrpt, avgt, sample, ss
    #[arg(long)]
    pub mode: Option<String>,

    /// Iteration length for duration-bounded modes (e.g. "500ms")
    #[arg(long)]
    pub iteration_time: Option<String>,

    /// Invocations per average-time iteration
    #[arg(long)]
    pub invocations: Option<u64>,

    /// Concurrent execution lanes per trial
    #[arg(long)]
    pub threads: Option<usize>,

    /// Seed for fixture random streams
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Wall-clock ceiling per trial (e.g. "10m")
    #[arg(long)]
    pub trial_timeout: Option<String>,

    /// Unit for reported statistics: ns, us, ms, s
    #[arg(long)]
    pub time_unit: Option<String>,

    /// Output format: human, json
    #[arg(long)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also save the JSON report into the configured output directory
    #[arg(long)]
    pub save: bool,

    /// Stop at the first failed trial and exit with an error
    #[arg(long)]
    pub fail_fast: bool,

    /// Pin execution lanes to CPUs
    #[arg(long)]
    pub pin_lanes: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Dry run - list the plan without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (default: discover mapbench.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered benchmarks
    List,
    /// Run benchmarks (default)
    Run,
    /// Print a default mapbench.toml
    Init,
}

/// Benchmark selection applied by the planner
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Regex over benchmark names
    pub filter: Option<Regex>,
    /// Exact group name
    pub group: Option<String>,
}

/// Run the mapbench CLI, building the registry with `build`.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if configuration is invalid,
/// output cannot be written, or a trial failed under `--fail-fast`.
pub fn run_with<B>(build: B) -> anyhow::Result<()>
where
    B: FnOnce(&WorkloadConfig) -> Result<Registry, RegistryError>,
{
    run_with_cli(Cli::parse(), build)
}

/// Run the mapbench CLI with pre-parsed arguments.
pub fn run_with_cli<B>(cli: Cli, build: B) -> anyhow::Result<()>
where
    B: FnOnce(&WorkloadConfig) -> Result<Registry, RegistryError>,
{
    init_logging(cli.verbose);

    if matches!(cli.command, Some(Commands::Init)) {
        print!("{}", BenchConfig::default_toml());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let settings = apply_cli_overrides(&cli, config).resolve()?;
    let selection = Selection {
        filter: cli
            .filter
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid benchmark filter")?,
        group: cli.group.clone(),
    };

    let registry = build(&settings.workload).context("failed to register benchmarks")?;

    match cli.command {
        Some(Commands::List) => list_benchmarks(&registry, &settings, &selection),
        _ if cli.dry_run => list_benchmarks(&registry, &settings, &selection),
        _ => run_benchmarks(&cli, &registry, &settings, &selection),
    }
}

/// Install the tracing subscriber; a subscriber installed earlier wins.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "mapbench=debug"
    } else {
        "mapbench=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> anyhow::Result<BenchConfig> {
    if let Some(path) = &cli.config {
        return Ok(BenchConfig::load(path)?);
    }
    match BenchConfig::discover_path() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using discovered configuration");
            Ok(BenchConfig::load(&path)?)
        }
        None => Ok(BenchConfig::default()),
    }
}

/// Layer CLI flags over file (or default) configuration.
pub fn apply_cli_overrides(cli: &Cli, mut config: BenchConfig) -> BenchConfig {
    let runner = &mut config.runner;
    if let Some(forks) = cli.forks {
        runner.forks = forks;
    }
    if let Some(n) = cli.warmup_iterations {
        runner.warmup_iterations = n;
    }
    if let Some(n) = cli.measurement_iterations {
        runner.measurement_iterations = n;
    }
    if let Some(mode) = &cli.mode {
        runner.mode = mode.clone();
    }
    if let Some(t) = &cli.iteration_time {
        runner.iteration_time = t.clone();
    }
    if let Some(n) = cli.invocations {
        runner.invocations_per_iteration = n;
    }
    if let Some(n) = cli.threads {
        runner.threads = n;
    }
    if let Some(seed) = cli.seed {
        runner.random_seed = seed;
    }
    if let Some(t) = &cli.trial_timeout {
        runner.trial_timeout = t.clone();
    }
    runner.fail_fast |= cli.fail_fast;
    runner.pin_lanes |= cli.pin_lanes;

    if let Some(unit) = &cli.time_unit {
        config.output.time_unit = unit.clone();
    }
    if let Some(format) = &cli.format {
        config.output.format = format.clone();
    }
    config
}

fn list_benchmarks(
    registry: &Registry,
    settings: &RunSettings,
    selection: &Selection,
) -> anyhow::Result<()> {
    let plan = build_plan(
        registry,
        settings.mode,
        selection.filter.as_ref(),
        selection.group.as_deref(),
    );

    println!("Mapbench Plan:");
    let mut current_group: Option<&str> = None;
    for bench in plan.benchmarks() {
        if current_group != Some(bench.group()) {
            println!("├── group: {}", bench.group());
            current_group = Some(bench.group());
        }
        println!("│   ├── {} ({})", bench.name(), bench.scope());
    }
    println!(
        "{} benchmarks, {} modes, {} forks each: {} trials.",
        plan.benchmarks().len(),
        settings.mode.modes().len(),
        settings.forks,
        plan.len() * settings.forks as usize
    );
    Ok(())
}

/// Plan, execute and report a run without any terminal output.
///
/// Returns the report and whether `fail_fast` cut the run short.
pub fn execute_run(
    registry: &Registry,
    settings: &RunSettings,
    selection: &Selection,
    show_progress: bool,
) -> (Report, bool) {
    let started_at = chrono::Utc::now();
    let start_time = Instant::now();

    let plan = build_plan(
        registry,
        settings.mode,
        selection.filter.as_ref(),
        selection.group.as_deref(),
    );
    tracing::info!(
        entries = plan.len(),
        forks = settings.forks,
        heap_size_hint = settings.heap_size_hint,
        "starting run"
    );

    let exec_config = ExecutionConfig {
        show_progress,
        ..ExecutionConfig::from(settings)
    };
    let outcome = Executor::new(exec_config).execute(&plan);
    let stats = compute_statistics(&outcome.results);

    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    tracing::debug!(
        values_consumed = mapbench_core::total_consumed(),
        "run finished"
    );
    let report = build_report(
        &outcome,
        &stats,
        settings,
        plan.len(),
        started_at,
        total_duration_ms,
    );
    (report, outcome.aborted)
}

fn run_benchmarks(
    cli: &Cli,
    registry: &Registry,
    settings: &RunSettings,
    selection: &Selection,
) -> anyhow::Result<()> {
    let (report, aborted) = execute_run(registry, settings, selection, !cli.no_progress);

    if report.results.is_empty() && report.failures.is_empty() {
        println!("No benchmarks found.");
        return Ok(());
    }

    let output = match settings.format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Human => format_human_output(&report),
    };

    if let Some(path) = &cli.output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(output.as_bytes())?;
        tracing::info!(path = %path.display(), "report written");
    } else {
        print!("{}", output);
    }

    if cli.save {
        std::fs::create_dir_all(&settings.directory)?;
        let path = settings.directory.join(format!(
            "report-{}.json",
            report.meta.timestamp.format("%Y%m%dT%H%M%SZ")
        ));
        std::fs::write(&path, generate_json_report(&report)?)?;
        tracing::info!(path = %path.display(), "report saved");
    }

    if aborted {
        anyhow::bail!(
            "run stopped after {} failed trial(s) (--fail-fast)",
            report.failures.len()
        );
    }
    Ok(())
}
