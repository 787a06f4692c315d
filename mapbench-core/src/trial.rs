//! Trial Driver
//!
//! One trial is one fork of one benchmark in one timing mode:
//!
//! ```text
//! Initializing ──► WarmingUp ──► Measuring ──► Aggregating ──► Done
//!       │              │             │              │
//!       └──────────────┴─────────────┴──────────────┴──► Failed
//! ```
//!
//! `Aggregating` is entered once the last measurement iteration is recorded
//! and the samples are frozen; fixture teardown runs in that state.
//!
//! Fixtures are built fresh for every trial and torn down when it ends,
//! whichever way it ends. Warmup iterations fire the same hooks as
//! measurement iterations but their records are discarded.

use crate::blackhole::Blackhole;
use crate::error::{OperationError, TrialError};
use crate::fixture::{Fixture, FixtureSeed, FixtureSet, Scope};
use crate::measure::pin_lane;
use crate::sample::{Phase, ResultSet, ResultSetBuilder};
use crate::scheduler::{
    IterationBudget, IterationContext, IterationRecord, LaneFixture, TimingMode, run_iteration,
};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;

/// Lifecycle state of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TrialState {
    /// Building fixtures and firing per-trial hooks
    Initializing = 0,
    /// Running discarded warmup iterations
    WarmingUp = 1,
    /// Running recorded iterations
    Measuring = 2,
    /// Samples frozen into the result set; fixtures are being torn down.
    ///
    /// Statistics are computed later, by whoever receives the result set.
    Aggregating = 3,
    /// Finished with a result set
    Done = 4,
    /// Finished without a result set
    Failed = 5,
}

impl TrialState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TrialState::Initializing,
            1 => TrialState::WarmingUp,
            2 => TrialState::Measuring,
            3 => TrialState::Aggregating,
            4 => TrialState::Done,
            _ => TrialState::Failed,
        }
    }

    /// Whether the trial can no longer change state
    pub fn is_terminal(self) -> bool {
        matches!(self, TrialState::Done | TrialState::Failed)
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrialState::Initializing => "initializing",
            TrialState::WarmingUp => "warming-up",
            TrialState::Measuring => "measuring",
            TrialState::Aggregating => "aggregating",
            TrialState::Done => "done",
            TrialState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State and cancellation flag shared between a trial and its supervisor.
#[derive(Debug)]
pub struct TrialControl {
    state: AtomicU8,
    cancelled: AtomicBool,
}

impl Default for TrialControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TrialControl {
    /// Fresh control in `Initializing`
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TrialState::Initializing as u8),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> TrialState {
        TrialState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `next` unless the trial already reached a terminal state.
    ///
    /// Returns whether the transition happened.
    pub fn advance(&self, next: TrialState) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if TrialState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(next as u8)
                }
            })
            .is_ok()
    }

    /// Ask the trial to stop at its next invocation boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`TrialError::Cancelled`] if cancellation was requested
    #[inline(always)]
    pub fn checkpoint(&self) -> Result<(), TrialError> {
        if self.is_cancelled() {
            Err(TrialError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Parameters of one trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSpec {
    /// Fork index
    pub fork: u32,
    /// Timing mode
    pub mode: TimingMode,
    /// Discarded iterations
    pub warmup_iterations: u32,
    /// Recorded iterations
    pub measurement_iterations: u32,
    /// Iteration size
    pub budget: IterationBudget,
    /// Concurrent execution lanes
    pub lanes: usize,
    /// Run seed for fixture random streams
    pub seed: u64,
    /// Pin each lane to a CPU
    pub pin_lanes: bool,
}

/// Render a panic payload as text
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one complete trial, returning its frozen measurement samples.
///
/// `control` tracks the state machine; a cancellation request is honoured
/// between invocations.
pub fn run_trial<F, R, M, O>(
    name: &Arc<str>,
    scope: Scope,
    spec: &TrialSpec,
    make: &M,
    op: &O,
    control: &TrialControl,
) -> Result<ResultSet, TrialError>
where
    F: Fixture,
    M: Fn(FixtureSeed) -> F,
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError> + Sync,
{
    let result = drive(name, scope, spec, make, op, control);
    match &result {
        Ok(set) => {
            control.advance(TrialState::Done);
            tracing::debug!(benchmark = %name, fork = spec.fork, samples = set.len(), "trial done");
        }
        Err(e) => {
            control.advance(TrialState::Failed);
            tracing::debug!(benchmark = %name, fork = spec.fork, error = %e, "trial failed");
        }
    }
    result
}

fn drive<F, R, M, O>(
    name: &Arc<str>,
    scope: Scope,
    spec: &TrialSpec,
    make: &M,
    op: &O,
    control: &TrialControl,
) -> Result<ResultSet, TrialError>
where
    F: Fixture,
    M: Fn(FixtureSeed) -> F,
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError> + Sync,
{
    let lanes = spec.lanes.max(1);
    let mut fixtures = FixtureSet::new_trial(make, scope, lanes, spec.seed, spec.fork)?;
    let mut blackholes: Vec<Blackhole> = (0..lanes).map(|_| Blackhole::new()).collect();
    let mut builder = ResultSetBuilder::new(Arc::clone(name), spec.mode, spec.fork);

    if lanes == 1 && spec.pin_lanes {
        pin_lane(0);
    }

    let phases = [
        (Phase::Warmup, TrialState::WarmingUp, spec.warmup_iterations),
        (
            Phase::Measurement,
            TrialState::Measuring,
            spec.measurement_iterations,
        ),
    ];

    for (phase, state, iterations) in phases {
        control.advance(state);
        for iteration in 0..iterations {
            control.checkpoint()?;
            let ctx = IterationContext {
                fork: spec.fork,
                phase,
                iteration,
                mode: spec.mode,
                budget: spec.budget,
            };
            let records = run_lanes(
                &mut fixtures,
                &ctx,
                op,
                &mut blackholes,
                control,
                spec.pin_lanes,
            )?;
            if phase == Phase::Measurement {
                builder.record(iteration, records);
            }
        }
    }

    control.advance(TrialState::Aggregating);
    Ok(builder.freeze())
}

/// Fire per-iteration hooks, then run one iteration on every lane.
fn run_lanes<F, R, O>(
    fixtures: &mut FixtureSet<F>,
    ctx: &IterationContext,
    op: &O,
    blackholes: &mut [Blackhole],
    control: &TrialControl,
    pin_lanes: bool,
) -> Result<Vec<IterationRecord>, TrialError>
where
    F: Fixture,
    O: Fn(&F, &mut Blackhole) -> Result<R, OperationError> + Sync,
{
    fixtures.prepare_iteration(ctx.phase, ctx.iteration)?;
    let lanes = fixtures.lanes();

    if lanes == 1 {
        let (Some(fixture), Some(blackhole)) =
            (fixtures.instances_mut().first_mut(), blackholes.first_mut())
        else {
            return Ok(Vec::new());
        };
        let record = run_iteration(
            ctx,
            0,
            LaneFixture::Exclusive(fixture),
            op,
            blackhole,
            control,
        )?;
        return Ok(vec![record]);
    }

    // Lanes line up on the barrier before any of them starts its clock.
    let barrier = Barrier::new(lanes);
    let ctx = *ctx;

    let outcomes: Vec<thread::Result<Result<IterationRecord, TrialError>>> = match fixtures.scope()
    {
        Scope::Shared => {
            let Some(shared) = fixtures.shared() else {
                return Ok(Vec::new());
            };
            thread::scope(|s| {
                let handles: Vec<_> = blackholes
                    .iter_mut()
                    .enumerate()
                    .map(|(lane, blackhole)| {
                        let barrier = &barrier;
                        s.spawn(move || {
                            if pin_lanes {
                                pin_lane(lane);
                            }
                            barrier.wait();
                            let fixture = LaneFixture::Shared {
                                fixture: shared,
                                lanes,
                            };
                            let outcome =
                                run_iteration(&ctx, lane, fixture, op, blackhole, control);
                            if outcome.is_err() {
                                control.cancel();
                            }
                            outcome
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join()).collect()
            })
        }
        Scope::PerWorker => thread::scope(|s| {
            let handles: Vec<_> = fixtures
                .instances_mut()
                .iter_mut()
                .zip(blackholes.iter_mut())
                .enumerate()
                .map(|(lane, (fixture, blackhole))| {
                    let barrier = &barrier;
                    s.spawn(move || {
                        if pin_lanes {
                            pin_lane(lane);
                        }
                        barrier.wait();
                        let fixture = LaneFixture::Exclusive(fixture);
                        let outcome = run_iteration(&ctx, lane, fixture, op, blackhole, control);
                        if outcome.is_err() {
                            control.cancel();
                        }
                        outcome
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        }),
    };

    collect_lane_outcomes(&ctx, outcomes)
}

/// Keep every record if all lanes succeeded; otherwise surface the first
/// real failure, preferring it over the cancellations it triggered.
fn collect_lane_outcomes(
    ctx: &IterationContext,
    outcomes: Vec<thread::Result<Result<IterationRecord, TrialError>>>,
) -> Result<Vec<IterationRecord>, TrialError> {
    let mut records = Vec::with_capacity(outcomes.len());
    let mut cancelled = false;
    let mut failure = None;

    for (lane, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Ok(record)) => records.push(record),
            Ok(Err(TrialError::Cancelled)) => cancelled = true,
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(payload) => {
                failure.get_or_insert(TrialError::BenchmarkFailure {
                    phase: ctx.phase,
                    iteration: ctx.iteration,
                    lane,
                    invocation: 0,
                    cause: format!("panic: {}", panic_message(payload.as_ref())),
                });
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None if cancelled => Err(TrialError::Cancelled),
        None => Ok(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookError;
    use crate::fixture::{HookContext, HookLevels};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct Counting {
        hooks: Arc<AtomicU32>,
    }

    impl Fixture for Counting {
        const HOOKS: HookLevels = HookLevels::ITERATION;

        fn setup_iteration(&mut self, _ctx: &HookContext) -> Result<(), HookError> {
            self.hooks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn spec(mode: TimingMode, lanes: usize) -> TrialSpec {
        TrialSpec {
            fork: 0,
            mode,
            warmup_iterations: 2,
            measurement_iterations: 3,
            budget: IterationBudget {
                iteration_time: Duration::from_millis(2),
                invocations: 5,
            },
            lanes,
            seed: 42,
            pin_lanes: false,
        }
    }

    #[test]
    fn test_warmup_is_hooked_but_not_recorded() {
        let hooks = Arc::new(AtomicU32::new(0));
        let make = {
            let hooks = Arc::clone(&hooks);
            move |_: FixtureSeed| Counting {
                hooks: Arc::clone(&hooks),
            }
        };
        let op = |_: &Counting, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) };
        let control = TrialControl::new();

        let set = run_trial(
            &Arc::from("counting"),
            Scope::PerWorker,
            &spec(TimingMode::AverageTime, 1),
            &make,
            &op,
            &control,
        )
        .unwrap();

        assert_eq!(hooks.load(Ordering::SeqCst), 5);
        assert_eq!(set.len(), 3);
        assert!(set.samples().iter().all(|s| s.invocations == 5));
        assert_eq!(control.state(), TrialState::Done);
    }

    #[test]
    fn test_teardown_observes_frozen_samples_state() {
        struct Observer {
            control: Arc<TrialControl>,
            seen: Arc<std::sync::Mutex<Vec<TrialState>>>,
        }
        impl Fixture for Observer {
            fn teardown(&mut self) {
                self.seen.lock().unwrap().push(self.control.state());
            }
        }

        let control = Arc::new(TrialControl::new());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let make = {
            let control = Arc::clone(&control);
            let seen = Arc::clone(&seen);
            move |_: FixtureSeed| Observer {
                control: Arc::clone(&control),
                seen: Arc::clone(&seen),
            }
        };
        let op = |_: &Observer, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) };

        let set = run_trial(
            &Arc::from("observed"),
            Scope::PerWorker,
            &spec(TimingMode::AverageTime, 1),
            &make,
            &op,
            &control,
        )
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![TrialState::Aggregating]);
        assert_eq!(control.state(), TrialState::Done);
    }

    #[test]
    fn test_failure_discards_partial_samples() {
        let calls = AtomicU32::new(0);
        let make = |_: FixtureSeed| Counting {
            hooks: Arc::new(AtomicU32::new(0)),
        };
        let op = |_: &Counting, _: &mut Blackhole| -> Result<(), OperationError> {
            if calls.fetch_add(1, Ordering::SeqCst) >= 3 {
                Err("broken".into())
            } else {
                Ok(())
            }
        };
        let control = TrialControl::new();

        let err = run_trial(
            &Arc::from("flaky"),
            Scope::PerWorker,
            &spec(TimingMode::SingleShotTime, 1),
            &make,
            &op,
            &control,
        )
        .unwrap_err();

        assert_eq!(err.kind(), "benchmark_failure");
        assert_eq!(control.state(), TrialState::Failed);
    }

    #[test]
    fn test_per_worker_lanes_each_record() {
        let make = |_: FixtureSeed| Counting {
            hooks: Arc::new(AtomicU32::new(0)),
        };
        let op = |_: &Counting, _: &mut Blackhole| -> Result<u32, OperationError> { Ok(1) };

        let set = run_trial(
            &Arc::from("lanes"),
            Scope::PerWorker,
            &spec(TimingMode::AverageTime, 3),
            &make,
            &op,
            &TrialControl::new(),
        )
        .unwrap();

        assert_eq!(set.len(), 9);
        let mut lanes: Vec<usize> = set.samples().iter().map(|s| s.lane).collect();
        lanes.sort_unstable();
        lanes.dedup();
        assert_eq!(lanes, vec![0, 1, 2]);
    }

    #[test]
    fn test_lane_panic_becomes_failure() {
        let make = |_: FixtureSeed| Counting {
            hooks: Arc::new(AtomicU32::new(0)),
        };
        let op = |_: &Counting, _: &mut Blackhole| -> Result<(), OperationError> {
            panic!("lane exploded")
        };

        let err = run_trial(
            &Arc::from("panicky"),
            Scope::Shared,
            &spec(TimingMode::SingleShotTime, 2),
            &make,
            &op,
            &TrialControl::new(),
        )
        .unwrap_err();

        match err {
            TrialError::BenchmarkFailure { cause, .. } => assert!(cause.contains("lane exploded")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let make = |_: FixtureSeed| Counting {
            hooks: Arc::new(AtomicU32::new(0)),
        };
        let op = |_: &Counting, _: &mut Blackhole| -> Result<(), OperationError> { Ok(()) };
        let control = TrialControl::new();
        control.cancel();

        let err = run_trial(
            &Arc::from("cancelled"),
            Scope::PerWorker,
            &spec(TimingMode::Throughput, 1),
            &make,
            &op,
            &control,
        )
        .unwrap_err();
        assert!(matches!(err, TrialError::Cancelled));
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let control = TrialControl::new();
        assert!(control.advance(TrialState::WarmingUp));
        assert!(control.advance(TrialState::Failed));
        assert!(!control.advance(TrialState::Done));
        assert_eq!(control.state(), TrialState::Failed);
    }
}
