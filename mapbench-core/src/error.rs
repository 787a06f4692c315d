//! Error Types
//!
//! Failures are local to one trial: a hook failing, the operation under test
//! failing, or the trial running past its wall-clock ceiling. None of them
//! leak into sibling trials.

use crate::fixture::HookLevel;
use std::time::Duration;
use thiserror::Error;

/// Error returned by an operation under test.
pub type OperationError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised by a fixture hook.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Build a hook error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Fixture setup failed; aborts the trial.
#[derive(Debug, Clone, Error)]
pub enum SetupError {
    /// A hook at the given level returned an error
    #[error("{level} hook failed on lane {lane}: {source}")]
    Hook {
        /// Level of the failing hook
        level: HookLevel,
        /// Execution lane the fixture belongs to
        lane: usize,
        /// Underlying hook error
        source: HookError,
    },

    /// Per-invocation hooks need exclusive access, which a shared fixture
    /// cannot give while several lanes are running.
    #[error("per-invocation hooks cannot run on a shared fixture across {lanes} lanes")]
    SharedInvocationHook {
        /// Configured lane count
        lanes: usize,
    },
}

/// Why a trial ended without a result set.
#[derive(Debug, Clone, Error)]
pub enum TrialError {
    /// A fixture hook failed
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// The operation under test raised (or panicked) during an iteration
    #[error(
        "benchmark failure in iteration {iteration} ({phase}), lane {lane}, invocation {invocation}: {cause}"
    )]
    BenchmarkFailure {
        /// Phase the failing iteration belonged to
        phase: crate::Phase,
        /// Iteration index within its phase
        iteration: u32,
        /// Lane the invocation ran on
        lane: usize,
        /// Zero-based invocation index within the iteration
        invocation: u64,
        /// Rendered cause
        cause: String,
    },

    /// The trial outlived its wall-clock ceiling
    #[error("trial exceeded its {0:?} wall-clock ceiling")]
    Timeout(Duration),

    /// The trial observed a cancellation request between invocations
    #[error("trial cancelled")]
    Cancelled,
}

impl TrialError {
    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            TrialError::Setup(_) => "setup_error",
            TrialError::BenchmarkFailure { .. } => "benchmark_failure",
            TrialError::Timeout(_) | TrialError::Cancelled => "trial_timeout",
        }
    }
}

/// Registration rejected by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another definition already uses this name
    #[error("benchmark already registered: {0}")]
    Duplicate(String),

    /// Names must be non-empty
    #[error("benchmark name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_message() {
        let err = SetupError::Hook {
            level: HookLevel::Iteration,
            lane: 2,
            source: HookError::new("disk full"),
        };
        assert_eq!(
            err.to_string(),
            "per-iteration hook failed on lane 2: disk full"
        );
    }

    #[test]
    fn test_trial_error_kinds() {
        let setup: TrialError = SetupError::SharedInvocationHook { lanes: 4 }.into();
        assert_eq!(setup.kind(), "setup_error");
        assert_eq!(
            TrialError::Timeout(Duration::from_secs(1)).kind(),
            "trial_timeout"
        );
        assert_eq!(TrialError::Cancelled.kind(), "trial_timeout");
    }
}
