//! Benchmark Execution
//!
//! Drives the plan: for each (benchmark, mode) entry, forks run strictly one
//! after another in increasing index, each as an isolated trial. A failed
//! fork is recorded and excluded; the remaining forks and entries still run
//! unless `fail_fast` is set.
//!
//! ```text
//! ExecutionPlan
//!      │
//!      ▼
//! ┌──────────────┐
//! │   Executor   │  entry × fork → TrialRunner (thread + ceiling)
//! └──────┬───────┘
//!        │
//!        ▼
//! ExecutionOutcome (per-entry result sets + every failure)
//! ```

use crate::config::RunSettings;
use crate::planner::ExecutionPlan;
use crate::trial::TrialRunner;
use indicatif::{ProgressBar, ProgressStyle};
use mapbench_core::{IterationBudget, ResultSet, TimingMode, TrialError, TrialSpec};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for benchmark execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Trials per entry
    pub forks: u32,
    /// Discarded iterations per trial
    pub warmup_iterations: u32,
    /// Recorded iterations per trial
    pub measurement_iterations: u32,
    /// Iteration size
    pub budget: IterationBudget,
    /// Concurrent lanes per trial
    pub threads: usize,
    /// Fixture seed
    pub seed: i64,
    /// Pin lanes to CPUs
    pub pin_lanes: bool,
    /// Wall-clock ceiling per trial
    pub trial_timeout: Duration,
    /// Stop at the first failed trial
    pub fail_fast: bool,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl From<&RunSettings> for ExecutionConfig {
    fn from(settings: &RunSettings) -> Self {
        Self {
            forks: settings.forks,
            warmup_iterations: settings.warmup_iterations,
            measurement_iterations: settings.measurement_iterations,
            budget: settings.budget,
            threads: settings.threads,
            seed: settings.random_seed,
            pin_lanes: settings.pin_lanes,
            trial_timeout: settings.trial_timeout,
            fail_fast: settings.fail_fast,
            show_progress: false,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::from(&RunSettings::default())
    }
}

impl ExecutionConfig {
    /// Trial parameters for one fork of one mode
    pub fn trial_spec(&self, mode: TimingMode, fork: u32) -> TrialSpec {
        TrialSpec {
            fork,
            mode,
            warmup_iterations: self.warmup_iterations,
            measurement_iterations: self.measurement_iterations,
            budget: self.budget,
            lanes: self.threads,
            seed: self.seed as u64,
            pin_lanes: self.pin_lanes,
        }
    }
}

/// Samples of one (benchmark, mode) across its completed forks
#[derive(Debug, Clone)]
pub struct ModeExecutionResult {
    /// Benchmark name
    pub benchmark: Arc<str>,
    /// Benchmark group
    pub group: String,
    /// Timing mode
    pub mode: TimingMode,
    /// Concatenated samples of completed forks, in fork order
    pub result_set: ResultSet,
    /// Forks that produced a result set
    pub forks_completed: u32,
    /// Forks that failed
    pub forks_failed: u32,
}

/// One failed trial
#[derive(Debug, Clone)]
pub struct TrialFailure {
    /// Benchmark name
    pub benchmark: Arc<str>,
    /// Timing mode
    pub mode: TimingMode,
    /// Fork index
    pub fork: u32,
    /// Why the trial has no result set
    pub error: TrialError,
}

/// Everything one run produced
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// One entry per executed plan entry, in plan order
    pub results: Vec<ModeExecutionResult>,
    /// Failures in the order they happened
    pub failures: Vec<TrialFailure>,
    /// Trials started
    pub trials_run: usize,
    /// Whether `fail_fast` stopped the run early
    pub aborted: bool,
}

/// Execute a plan, one trial at a time
pub struct Executor {
    config: ExecutionConfig,
    runner: TrialRunner,
}

impl Executor {
    /// Create an executor
    pub fn new(config: ExecutionConfig) -> Self {
        let runner = TrialRunner::new(config.trial_timeout);
        Self { config, runner }
    }

    /// Execution configuration
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Execute every entry of `plan`
    pub fn execute(&self, plan: &ExecutionPlan) -> ExecutionOutcome {
        let total_trials = plan.len() as u64 * self.config.forks as u64;
        let pb = if self.config.show_progress {
            ProgressBar::new(total_trials)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut outcome = ExecutionOutcome::default();

        'plan: for entry in &plan.entries {
            let name = entry.def.name();
            let mut parts = Vec::with_capacity(self.config.forks as usize);
            let mut forks_failed = 0;

            for fork in 0..self.config.forks {
                pb.set_message(format!("{} [{}] fork {}", name, entry.mode, fork));
                let spec = self.config.trial_spec(entry.mode, fork);
                outcome.trials_run += 1;

                match self.runner.run(&entry.def, &spec) {
                    Ok(set) => {
                        tracing::debug!(
                            benchmark = %name,
                            mode = %entry.mode,
                            fork,
                            samples = set.len(),
                            "fork complete"
                        );
                        parts.push(set);
                    }
                    Err(error) => {
                        forks_failed += 1;
                        tracing::warn!(
                            benchmark = %name,
                            mode = %entry.mode,
                            fork,
                            kind = error.kind(),
                            error = %error,
                            "fork failed; excluded from statistics"
                        );
                        outcome.failures.push(TrialFailure {
                            benchmark: Arc::clone(name),
                            mode: entry.mode,
                            fork,
                            error,
                        });
                        if self.config.fail_fast {
                            outcome.aborted = true;
                        }
                    }
                }
                pb.inc(1);

                if outcome.aborted {
                    break;
                }
            }

            let forks_completed = parts.len() as u32;
            outcome.results.push(ModeExecutionResult {
                benchmark: Arc::clone(name),
                group: entry.def.group().to_string(),
                mode: entry.mode,
                result_set: ResultSet::concat(Arc::clone(name), entry.mode, parts),
                forks_completed,
                forks_failed,
            });

            if outcome.aborted {
                tracing::warn!(benchmark = %name, "fail-fast: stopping the run");
                break 'plan;
            }
        }

        if outcome.aborted {
            pb.abandon_with_message("Aborted");
        } else {
            pb.finish_with_message("Complete");
        }
        outcome
    }
}
