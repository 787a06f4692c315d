#![warn(missing_docs)]
//! Mapbench Statistical Engine
//!
//! Reduces recorded samples to summary statistics:
//! - Numerically stable moments via Welford's online algorithm
//! - Linear-interpolation percentiles over the full sample set
//! - A defined no-data sentinel for empty result sets

mod percentiles;
mod summary;
mod welford;

pub use percentiles::{Percentiles, compute_percentile, compute_percentiles, percentile_of_sorted};
pub use summary::{AggregationError, Statistics, aggregate, try_aggregate};
pub use welford::Welford;
