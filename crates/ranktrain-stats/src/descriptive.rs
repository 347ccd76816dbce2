//! One-pass summaries of a set of values.

use crate::moments::SumOfSquares;

/// Count, maximum, mean and (population) standard deviation of a set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Summarizes `values`, or returns `None` when there are none.
    ///
    /// ```
    /// # use ranktrain_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut moments = SumOfSquares::new();
        let mut max = f64::NEG_INFINITY;
        for value in values {
            moments.push(value);
            max = max.max(value);
        }
        let mean = moments.mean()?;
        let variance = moments.squared_error() / moments.count() as f64;
        Some(Self {
            count: moments.count(),
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert_eq!(DescriptiveStats::new([]), None);
    }

    #[test]
    fn test_single_value() {
        let stats = DescriptiveStats::new([0.25]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.max, 0.25);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_spread() {
        let stats = DescriptiveStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
    }
}
