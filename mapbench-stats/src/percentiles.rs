//! Percentile Computation
//!
//! Percentiles are read from the full sample set; tail values are the signal
//! in `SampleTime` mode, so nothing is trimmed.

/// Standard percentiles reported per benchmark and mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 99th percentile
    pub p99: f64,
}

/// Percentile of an already sorted, non-empty slice.
///
/// Uses linear interpolation between nearest ranks.
pub fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let p = (percentile / 100.0).clamp(0.0, 1.0);
            let rank = p * (n - 1) as f64;
            let lower_idx = rank.floor() as usize;
            let upper_idx = (lower_idx + 1).min(n - 1);
            let fraction = rank - lower_idx as f64;

            sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx])
        }
    }
}

/// Compute a single percentile from unsorted samples
///
/// # Examples
///
/// ```
/// # use mapbench_stats::compute_percentile;
/// let samples = vec![5.0, 1.0, 4.0, 2.0, 3.0];
/// assert_eq!(compute_percentile(&samples, 50.0), 3.0);
/// ```
pub fn compute_percentile(samples: &[f64], percentile: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_of_sorted(&sorted, percentile)
}

/// Compute all standard percentiles with a single sort
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Percentiles {
        p50: percentile_of_sorted(&sorted, 50.0),
        p90: percentile_of_sorted(&sorted, 90.0),
        p99: percentile_of_sorted(&sorted, 99.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let p50 = compute_percentile(&samples, 50.0);
        assert!((p50 - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_interpolates_between_ranks() {
        let samples = vec![10.0, 20.0];
        assert!((compute_percentile(&samples, 50.0) - 15.0).abs() < f64::EPSILON);
        assert!((compute_percentile(&samples, 90.0) - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_tail_percentiles() {
        let samples: Vec<f64> = (1..=1000).map(|x| x as f64).collect();
        let p = compute_percentiles(&samples);

        assert!(p.p90 > 895.0 && p.p90 < 905.0);
        assert!(p.p99 > 985.0 && p.p99 < 995.0);
    }

    #[test]
    fn test_single_sample() {
        let samples = vec![42.0];
        let p50 = compute_percentile(&samples, 50.0);
        assert!((p50 - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_samples() {
        assert!(compute_percentile(&[], 50.0).is_nan());
    }
}
