//! Trial Runner
//!
//! Runs one trial on its own named thread, so a trial never shares stack or
//! thread-local state with its siblings, and enforces the wall-clock ceiling.
//!
//! A trial that outlives the ceiling is cancelled. The cancellation is
//! cooperative (checked between invocations); a trial that does not stop
//! within a short grace period is abandoned. Either way its partial data is
//! discarded.

use mapbench_core::{
    BenchmarkDef, Phase, ResultSet, TrialControl, TrialError, TrialSpec, TrialState,
    panic_message,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How long a cancelled trial gets to wind down before it is abandoned
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Runs isolated trials under a wall-clock ceiling
#[derive(Debug, Clone, Copy)]
pub struct TrialRunner {
    timeout: Duration,
}

impl TrialRunner {
    /// Create a runner with the given per-trial ceiling
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-trial ceiling
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one trial of `def`.
    ///
    /// Returns the trial's frozen result set, or the reason it has none.
    pub fn run(&self, def: &BenchmarkDef, spec: &TrialSpec) -> Result<ResultSet, TrialError> {
        let control = Arc::new(TrialControl::new());
        let (tx, rx) = mpsc::channel();

        let thread_def = def.clone();
        let thread_spec = spec.clone();
        let thread_control = Arc::clone(&control);
        let spawned = thread::Builder::new()
            .name(format!("mapbench-trial-{}", spec.fork))
            .spawn(move || {
                let result = guarded_trial(&thread_def, &thread_spec, &thread_control);
                // The receiver is gone once the trial was abandoned
                let _ = tx.send(result);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    benchmark = %def.name(),
                    error = %e,
                    "could not spawn trial thread; running inline without a ceiling"
                );
                return guarded_trial(def, spec, &control);
            }
        };

        match rx.recv_timeout(self.timeout) {
            Ok(result) => {
                if handle.join().is_err() {
                    tracing::debug!(benchmark = %def.name(), "trial thread panicked after reporting");
                }
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                control.cancel();
                control.advance(TrialState::Failed);
                tracing::warn!(
                    benchmark = %def.name(),
                    fork = spec.fork,
                    timeout = ?self.timeout,
                    "trial exceeded its ceiling; cancelling"
                );
                match rx.recv_timeout(CANCEL_GRACE) {
                    Ok(_) => {
                        let _ = handle.join();
                    }
                    Err(_) => {
                        tracing::warn!(
                            benchmark = %def.name(),
                            fork = spec.fork,
                            "trial did not stop; abandoning its thread"
                        );
                    }
                }
                Err(TrialError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(TrialError::BenchmarkFailure {
                    phase: phase_of(control.state()),
                    iteration: 0,
                    lane: 0,
                    invocation: 0,
                    cause: "trial thread exited without a result".to_string(),
                })
            }
        }
    }
}

/// Run the trial, turning a panic into `BenchmarkFailure`.
fn guarded_trial(
    def: &BenchmarkDef,
    spec: &TrialSpec,
    control: &TrialControl,
) -> Result<ResultSet, TrialError> {
    match panic::catch_unwind(AssertUnwindSafe(|| def.run_trial(spec, control))) {
        Ok(result) => result,
        Err(payload) => {
            let phase = phase_of(control.state());
            control.advance(TrialState::Failed);
            Err(TrialError::BenchmarkFailure {
                phase,
                iteration: 0,
                lane: 0,
                invocation: 0,
                cause: format!("panic: {}", panic_message(payload.as_ref())),
            })
        }
    }
}

fn phase_of(state: TrialState) -> Phase {
    match state {
        TrialState::Initializing | TrialState::WarmingUp => Phase::Warmup,
        _ => Phase::Measurement,
    }
}
