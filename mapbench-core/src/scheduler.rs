//! Iteration Scheduler
//!
//! Groups invocations into iterations according to the timing mode:
//!
//! | Mode             | Iteration bound            | Recorded                         |
//! |------------------|----------------------------|----------------------------------|
//! | `Throughput`     | wall-clock `iteration_time`| invocation count + elapsed time  |
//! | `AverageTime`    | `invocations` per iteration| invocation count + elapsed time  |
//! | `SampleTime`     | wall-clock `iteration_time`| every invocation's duration      |
//! | `SingleShotTime` | exactly one invocation     | that invocation's duration       |
//!
//! Duration-bounded iterations always finish the invocation in flight, so the
//! first invocation is never truncated even when it alone exceeds the budget.
//!
//! `Throughput` and `AverageTime` time the whole loop by wall clock, dropping
//! each result inside it. When a per-invocation hook must run between calls,
//! each call and its drop are timed on their own and only the hook is left
//! out. `SampleTime` and `SingleShotTime` always time calls one by one.

use crate::blackhole::Blackhole;
use crate::error::{OperationError, SetupError, TrialError};
use crate::fixture::{Fixture, HookContext, HookLevel, fire_hook};
use crate::invocation::{invoke, invoke_untimed};
use crate::measure::Timer;
use crate::sample::Phase;
use crate::trial::TrialControl;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on per-invocation durations kept for one `SampleTime` iteration
pub const MAX_SAMPLES_PER_ITERATION: usize = 1_000_000;

/// Invocations between cancellation checks in a loop timed as a whole
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// How invocations are grouped and what is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimingMode {
    /// Invocations per second over a fixed wall-clock iteration
    Throughput,
    /// Mean time per invocation over a fixed invocation count
    AverageTime,
    /// Individual invocation durations over a fixed wall-clock iteration
    SampleTime,
    /// One cold invocation per iteration
    SingleShotTime,
}

impl TimingMode {
    /// Every mode, in declared order
    pub const ALL: [TimingMode; 4] = [
        TimingMode::Throughput,
        TimingMode::AverageTime,
        TimingMode::SampleTime,
        TimingMode::SingleShotTime,
    ];

    /// Short identifier used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            TimingMode::Throughput => "thrpt",
            TimingMode::AverageTime => "avgt",
            TimingMode::SampleTime => "sample",
            TimingMode::SingleShotTime => "ss",
        }
    }

    /// Whether the reported metric is a rate rather than a duration
    pub fn is_rate(self) -> bool {
        matches!(self, TimingMode::Throughput)
    }
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "thrpt" | "throughput" => Ok(TimingMode::Throughput),
            "avgt" | "average" | "average-time" | "averagetime" => Ok(TimingMode::AverageTime),
            "sample" | "sample-time" | "sampletime" => Ok(TimingMode::SampleTime),
            "ss" | "single-shot" | "singleshot" | "single-shot-time" | "singleshottime" => {
                Ok(TimingMode::SingleShotTime)
            }
            other => Err(format!("Unknown timing mode: {}", other)),
        }
    }
}

/// Mode option of a run: one mode, or every mode independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeSelection {
    /// A single mode
    Single(TimingMode),
    /// Every mode, each producing its own result set
    #[default]
    All,
}

impl ModeSelection {
    /// Modes to run, in declared order
    pub fn modes(self) -> Vec<TimingMode> {
        match self {
            ModeSelection::Single(mode) => vec![mode],
            ModeSelection::All => TimingMode::ALL.to_vec(),
        }
    }
}

impl fmt::Display for ModeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeSelection::Single(mode) => mode.fmt(f),
            ModeSelection::All => f.write_str("all"),
        }
    }
}

impl FromStr for ModeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(ModeSelection::All)
        } else {
            s.parse().map(ModeSelection::Single)
        }
    }
}

/// Size of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    /// Wall-clock length for `Throughput` and `SampleTime`
    pub iteration_time: Duration,
    /// Invocation count for `AverageTime`
    pub invocations: u64,
}

impl Default for IterationBudget {
    fn default() -> Self {
        Self {
            iteration_time: Duration::from_secs(1),
            invocations: 1,
        }
    }
}

/// Where an iteration sits inside its trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    /// Fork index
    pub fork: u32,
    /// Warmup or measurement
    pub phase: Phase,
    /// Index within the phase
    pub iteration: u32,
    /// Timing mode
    pub mode: TimingMode,
    /// Iteration size
    pub budget: IterationBudget,
}

/// What one lane measured during one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationRecord {
    /// Lane index
    pub lane: usize,
    /// Invocations completed
    pub invocations: u64,
    /// Measured nanoseconds across those invocations
    pub elapsed_ns: u64,
    /// Individual durations; filled only in `SampleTime`
    pub durations: Vec<u64>,
}

/// A lane's view of its fixture
pub enum LaneFixture<'a, F> {
    /// The lane owns the instance for the iteration
    Exclusive(&'a mut F),
    /// The instance is shared with `lanes` concurrent lanes
    Shared {
        /// Shared instance
        fixture: &'a F,
        /// Concurrent lanes sharing it
        lanes: usize,
    },
}

impl<F: Fixture> LaneFixture<'_, F> {
    #[inline(always)]
    fn get(&self) -> &F {
        match self {
            LaneFixture::Exclusive(fixture) => fixture,
            LaneFixture::Shared { fixture, .. } => fixture,
        }
    }

    fn prepare_invocation(&mut self, ctx: &HookContext) -> Result<(), SetupError> {
        match self {
            LaneFixture::Exclusive(fixture) => fire_hook(*fixture, HookLevel::Invocation, ctx),
            LaneFixture::Shared { lanes, .. } => {
                if F::HOOKS.contains(HookLevel::Invocation) {
                    Err(SetupError::SharedInvocationHook { lanes: *lanes })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Run one iteration on one lane.
pub fn run_iteration<F, R, O>(
    ctx: &IterationContext,
    lane: usize,
    mut fixture: LaneFixture<'_, F>,
    op: &O,
    blackhole: &mut Blackhole,
    control: &TrialControl,
) -> Result<IterationRecord, TrialError>
where
    F: Fixture,
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError>,
{
    let per_invocation_hook = F::HOOKS.contains(HookLevel::Invocation);
    let budget_ns = ctx.budget.iteration_time.as_nanos() as u64;

    let failure = |invocation: u64, err: OperationError| TrialError::BenchmarkFailure {
        phase: ctx.phase,
        iteration: ctx.iteration,
        lane,
        invocation,
        cause: err.to_string(),
    };
    let hook_ctx = |invocation: u64| HookContext {
        fork: ctx.fork,
        lane,
        phase: Some(ctx.phase),
        iteration: ctx.iteration,
        invocation,
    };

    let mut count: u64 = 0;
    let mut measured_ns: u64 = 0;
    let mut durations = Vec::new();

    match ctx.mode {
        TimingMode::SingleShotTime => {
            control.checkpoint()?;
            if per_invocation_hook {
                fixture.prepare_invocation(&hook_ctx(0))?;
            }
            let (ns, value) = invoke(op, fixture.get(), blackhole).map_err(|e| failure(0, e))?;
            drop(value);
            count = 1;
            measured_ns = ns;
        }
        TimingMode::SampleTime => {
            let wall = Timer::start();
            loop {
                control.checkpoint()?;
                if per_invocation_hook {
                    fixture.prepare_invocation(&hook_ctx(count))?;
                }
                let (ns, value) =
                    invoke(op, fixture.get(), blackhole).map_err(|e| failure(count, e))?;
                drop(value);
                durations.push(ns);
                count += 1;
                measured_ns = measured_ns.saturating_add(ns);
                if wall.stop() >= budget_ns {
                    break;
                }
                if durations.len() >= MAX_SAMPLES_PER_ITERATION {
                    tracing::debug!(lane, "sample-time iteration reached its sample cap");
                    break;
                }
            }
        }
        TimingMode::Throughput | TimingMode::AverageTime => {
            let fixed_count = match ctx.mode {
                TimingMode::AverageTime => Some(ctx.budget.invocations.max(1)),
                _ => None,
            };
            let done = |count: u64, wall: &Timer| match fixed_count {
                Some(target) => count >= target,
                None => wall.stop() >= budget_ns,
            };

            if per_invocation_hook {
                let wall = Timer::start();
                loop {
                    control.checkpoint()?;
                    fixture.prepare_invocation(&hook_ctx(count))?;
                    let timer = Timer::start();
                    let value = invoke_untimed(op, fixture.get(), blackhole)
                        .map_err(|e| failure(count, e))?;
                    drop(value);
                    measured_ns = measured_ns.saturating_add(timer.stop());
                    count += 1;
                    if done(count, &wall) {
                        break;
                    }
                }
            } else {
                let wall = Timer::start();
                loop {
                    if count % CANCEL_CHECK_INTERVAL == 0 {
                        control.checkpoint()?;
                    }
                    drop(
                        invoke_untimed(op, fixture.get(), blackhole)
                            .map_err(|e| failure(count, e))?,
                    );
                    count += 1;
                    if done(count, &wall) {
                        break;
                    }
                }
                measured_ns = wall.stop();
            }
        }
    }

    Ok(IterationRecord {
        lane,
        invocations: count,
        elapsed_ns: measured_ns,
        durations,
    })
}
