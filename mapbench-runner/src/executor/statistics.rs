//! Statistics Computation
//!
//! Each (benchmark, mode) result set is reduced independently, so the work
//! is spread over Rayon's pool. Trials themselves never run in parallel.

use super::execution::ModeExecutionResult;
use mapbench_stats::{Statistics, aggregate};
use rayon::prelude::*;

/// Compute statistics for every result, in the same order
///
/// Values are in the mode's base unit: operations per second for
/// `Throughput`, nanoseconds per operation otherwise. A result without
/// samples gets [`Statistics::no_data`].
pub fn compute_statistics(results: &[ModeExecutionResult]) -> Vec<Statistics> {
    results
        .par_iter()
        .map(|r| aggregate(&r.result_set.metric_values()))
        .collect()
}
