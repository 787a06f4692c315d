//! Summary Statistics
//!
//! Reduces the metric values of one result set (durations, or operations per
//! second in `Throughput` mode) to the reported summary. An empty or
//! malformed input yields the no-data sentinel instead of an error.

use crate::percentiles::compute_percentiles;
use crate::welford::Welford;
use thiserror::Error;

/// Why a value set could not be summarized
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// Nothing to aggregate (e.g. every fork failed)
    #[error("no samples to aggregate")]
    Empty,

    /// A value was NaN or infinite
    #[error("sample {index} is not finite ({value})")]
    NonFinite {
        /// Position of the offending value
        index: usize,
        /// The value itself
        value: f64,
    },
}

/// Summary of one benchmark in one mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Values aggregated
    pub sample_count: usize,
}

impl Statistics {
    /// Sentinel for an empty result set: zero samples, every other field NaN
    pub fn no_data() -> Self {
        Self {
            mean: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p50: f64::NAN,
            p90: f64::NAN,
            p99: f64::NAN,
            std_dev: f64::NAN,
            sample_count: 0,
        }
    }

    /// Whether this is the no-data sentinel
    pub fn is_no_data(&self) -> bool {
        self.sample_count == 0
    }

    /// Coefficient of variation in percent
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 || self.is_no_data() {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}

/// Summarize `values`, rejecting empty or non-finite input.
pub fn try_aggregate(values: &[f64]) -> Result<Statistics, AggregationError> {
    if values.is_empty() {
        return Err(AggregationError::Empty);
    }
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AggregationError::NonFinite { index, value });
    }

    let moments: Welford = values.iter().copied().collect();
    let percentiles = compute_percentiles(values);

    Ok(Statistics {
        mean: moments.mean().unwrap_or(f64::NAN),
        min: moments.min().unwrap_or(f64::NAN),
        max: moments.max().unwrap_or(f64::NAN),
        p50: percentiles.p50,
        p90: percentiles.p90,
        p99: percentiles.p99,
        std_dev: moments.std_dev().unwrap_or(f64::NAN),
        sample_count: values.len(),
    })
}

/// Summarize `values`, falling back to [`Statistics::no_data`].
pub fn aggregate(values: &[f64]) -> Statistics {
    try_aggregate(values).unwrap_or_else(|_| Statistics::no_data())
}
