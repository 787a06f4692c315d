//! Streaming Moments
//!
//! Welford's online update keeps mean and variance stable over long sample
//! runs where a naive sum of squares would lose precision.

/// Running count, mean, variance, min and max
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Welford {
    fn default() -> Self {
        Self::new()
    }
}

impl Welford {
    /// Empty accumulator
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Fold one value in
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Values seen
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance (`M2 / n`), `None` when empty
    pub fn variance(&self) -> Option<f64> {
        (self.count > 0).then(|| self.m2 / self.count as f64)
    }

    /// Population standard deviation, `None` when empty
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Smallest value, `None` when empty
    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    /// Largest value, `None` when empty
    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

impl FromIterator<f64> for Welford {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Welford::new();
        for value in iter {
            acc.push(value);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_set() {
        let acc: Welford = [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().collect();
        assert_eq!(acc.count(), 5);
        assert!((acc.mean().unwrap() - 3.0).abs() < 1e-12);
        assert!((acc.variance().unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(acc.min(), Some(1.0));
        assert_eq!(acc.max(), Some(5.0));
    }

    #[test]
    fn test_empty_has_no_moments() {
        let acc = Welford::new();
        assert_eq!(acc.mean(), None);
        assert_eq!(acc.std_dev(), None);
        assert_eq!(acc.min(), None);
    }

    #[test]
    fn test_stable_with_large_offset() {
        // Naive sum-of-squares loses every digit of the variance here
        let offset = 1e9;
        let acc: Welford = [4.0, 7.0, 13.0, 16.0]
            .into_iter()
            .map(|x| x + offset)
            .collect();
        assert!((acc.variance().unwrap() - 22.5).abs() < 1e-6);
    }
}
