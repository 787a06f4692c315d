//! Benchmark Executor
//!
//! Runs the plan and turns its result sets into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (registry × modes)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Run forks as isolated trials, collect result sets
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ statistics  │  Aggregate each (benchmark, mode) (parallel)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Scale to the output unit, list failures
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Fork loop, failure isolation, fail-fast
//! - [`statistics`] - Parallel statistics computation
//! - [`report`] - Report building
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod execution;
mod formatting;
mod metadata;
mod report;
mod statistics;

pub use execution::{
    ExecutionConfig, ExecutionOutcome, Executor, ModeExecutionResult, TrialFailure,
};
pub use formatting::format_human_output;
pub use metadata::build_report_meta;
pub use report::build_report;
pub use statistics::compute_statistics;
