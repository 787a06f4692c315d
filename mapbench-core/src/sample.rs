//! Samples and Result Sets
//!
//! A `ResultSetBuilder` is created empty at trial start and only receives
//! measurement-phase iterations. At trial end it is frozen into a read-only
//! `ResultSet`. Warmup iterations never reach the builder.

use crate::scheduler::{IterationRecord, TimingMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Phase an iteration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Discarded iterations that bring the environment to steady state
    Warmup,
    /// Recorded iterations
    Measurement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => f.write_str("warmup"),
            Phase::Measurement => f.write_str("measurement"),
        }
    }
}

/// One measured duration.
///
/// For `Throughput` and `AverageTime` the duration covers `invocations`
/// invocations; for `SampleTime` and `SingleShotTime` it covers exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Benchmark the sample belongs to
    pub benchmark: Arc<str>,
    /// Fork (trial) index
    pub fork: u32,
    /// Measurement iteration index
    pub iteration: u32,
    /// Execution lane
    pub lane: usize,
    /// Measured nanoseconds
    pub duration_ns: u64,
    /// Invocations covered by `duration_ns`
    pub invocations: u64,
}

impl Sample {
    /// The value the statistics are computed over, in the mode's unit:
    /// operations per second for `Throughput`, nanoseconds per operation
    /// otherwise.
    pub fn metric(&self, mode: TimingMode) -> f64 {
        match mode {
            TimingMode::Throughput => {
                if self.duration_ns == 0 {
                    f64::INFINITY
                } else {
                    self.invocations as f64 * 1e9 / self.duration_ns as f64
                }
            }
            TimingMode::AverageTime => {
                if self.invocations == 0 {
                    f64::NAN
                } else {
                    self.duration_ns as f64 / self.invocations as f64
                }
            }
            TimingMode::SampleTime | TimingMode::SingleShotTime => self.duration_ns as f64,
        }
    }
}

/// Frozen measurement-phase samples for one benchmark and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    benchmark: Arc<str>,
    mode: TimingMode,
    samples: Vec<Sample>,
}

impl ResultSet {
    /// A result set with no samples (e.g. every fork failed)
    pub fn empty(benchmark: Arc<str>, mode: TimingMode) -> Self {
        Self {
            benchmark,
            mode,
            samples: Vec::new(),
        }
    }

    /// Concatenate per-fork result sets, in the order given.
    ///
    /// Parts recorded for another benchmark or mode are skipped.
    pub fn concat(
        benchmark: Arc<str>,
        mode: TimingMode,
        parts: impl IntoIterator<Item = ResultSet>,
    ) -> Self {
        let mut samples = Vec::new();
        for part in parts {
            if part.benchmark == benchmark && part.mode == mode {
                samples.extend(part.samples);
            } else {
                tracing::warn!(
                    expected = %benchmark,
                    got = %part.benchmark,
                    "dropping result set recorded for another benchmark or mode"
                );
            }
        }
        Self {
            benchmark,
            mode,
            samples,
        }
    }

    /// Benchmark name
    pub fn benchmark(&self) -> &Arc<str> {
        &self.benchmark
    }

    /// Timing mode the samples were recorded in
    pub fn mode(&self) -> TimingMode {
        self.mode
    }

    /// Samples in recording order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples were recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Invocations covered by all samples
    pub fn total_invocations(&self) -> u64 {
        self.samples.iter().map(|s| s.invocations).sum()
    }

    /// Per-sample metric values (see [`Sample::metric`])
    pub fn metric_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.metric(self.mode)).collect()
    }
}

/// Append-only log of measurement iterations for one trial.
#[derive(Debug)]
pub struct ResultSetBuilder {
    benchmark: Arc<str>,
    mode: TimingMode,
    fork: u32,
    samples: Vec<Sample>,
}

impl ResultSetBuilder {
    /// Start an empty log for one fork
    pub fn new(benchmark: Arc<str>, mode: TimingMode, fork: u32) -> Self {
        Self {
            benchmark,
            mode,
            fork,
            samples: Vec::new(),
        }
    }

    /// Append the records of one measurement iteration
    pub(crate) fn record(&mut self, iteration: u32, records: Vec<IterationRecord>) {
        for record in records {
            let lane = record.lane;
            if record.durations.is_empty() {
                self.samples.push(Sample {
                    benchmark: Arc::clone(&self.benchmark),
                    fork: self.fork,
                    iteration,
                    lane,
                    duration_ns: record.elapsed_ns,
                    invocations: record.invocations,
                });
            } else {
                self.samples
                    .extend(record.durations.into_iter().map(|duration_ns| Sample {
                        benchmark: Arc::clone(&self.benchmark),
                        fork: self.fork,
                        iteration,
                        lane,
                        duration_ns,
                        invocations: 1,
                    }));
            }
        }
    }

    /// Samples recorded so far
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Freeze into a read-only result set
    pub fn freeze(self) -> ResultSet {
        ResultSet {
            benchmark: self.benchmark,
            mode: self.mode,
            samples: self.samples,
        }
    }
}
