#![warn(missing_docs)]
//! Mapbench Core - Execution Engine
//!
//! This crate runs benchmark trials in-process:
//! - `Blackhole` sink that keeps results observable to the optimizer
//! - Fixture lifecycle with per-trial, per-iteration and per-invocation hooks
//! - Iteration scheduling for the four timing modes
//! - Trial state machine with cooperative cancellation
//! - Explicit, ordered benchmark registry

mod blackhole;
mod error;
mod fixture;
mod invocation;
mod measure;
mod registry;
mod sample;
mod scheduler;
mod trial;

pub use blackhole::{Blackhole, total_consumed};
pub use error::{HookError, OperationError, RegistryError, SetupError, TrialError};
pub use fixture::{Fixture, FixtureSeed, FixtureSet, HookContext, HookLevel, HookLevels, Scope};
pub use invocation::{invoke, invoke_untimed};
pub use measure::{Timer, pin_to_cpu};
pub use registry::{BenchmarkDef, Registry, TrialTarget};
pub use sample::{Phase, ResultSet, ResultSetBuilder, Sample};
pub use scheduler::{
    CANCEL_CHECK_INTERVAL, IterationBudget, IterationContext, IterationRecord, LaneFixture,
    MAX_SAMPLES_PER_ITERATION, ModeSelection, TimingMode, run_iteration,
};
pub use trial::{TrialControl, TrialSpec, TrialState, panic_message, run_trial};
