//! Streaming first and second moments.
//!
//! [`SumOfSquares`] keeps `n`, `Σx` and `Σx²` so that the squared error around the mean
//! (`Σ(x - mean)²`) of any set can be read without revisiting its values, and two disjoint
//! sets can be combined or subtracted in constant time. The random forest split search uses
//! this to score a candidate threshold with a single pass over the node's documents.

use std::ops::{Add, Sub};

/// Count, sum and sum of squares of a set of values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SumOfSquares {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl SumOfSquares {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Adds one value.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Number of accumulated values.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of accumulated values.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of accumulated values, or `None` when empty.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Sum of squared deviations from the mean (`Σ(x - mean)²`).
    ///
    /// Returns `0.0` for an empty set. Rounding can push the raw formula slightly below zero
    /// for constant inputs, so the result is clamped at zero.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn squared_error(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum_sq - self.sum * self.sum / self.count as f64).max(0.0)
    }
}

impl Add for SumOfSquares {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            count: self.count + rhs.count,
            sum: self.sum + rhs.sum,
            sum_sq: self.sum_sq + rhs.sum_sq,
        }
    }
}

impl Sub for SumOfSquares {
    type Output = Self;

    /// Removes a subset previously accumulated into `self`.
    fn sub(self, rhs: Self) -> Self {
        Self {
            count: self.count - rhs.count,
            sum: self.sum - rhs.sum,
            sum_sq: self.sum_sq - rhs.sum_sq,
        }
    }
}

impl FromIterator<f64> for SumOfSquares {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
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
    fn test_empty() {
        let acc = SumOfSquares::new();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.mean(), None);
        assert_eq!(acc.squared_error(), 0.0);
    }

    #[test]
    fn test_constant_values_have_no_error() {
        let acc: SumOfSquares = [3.0; 7].into_iter().collect();
        assert_eq!(acc.mean(), Some(3.0));
        assert_eq!(acc.squared_error(), 0.0);
    }

    #[test]
    fn test_split_and_merge() {
        let all: SumOfSquares = [0.0, 1.0, 1.0, 2.0, 3.0, 3.0].into_iter().collect();
        let left: SumOfSquares = [0.0, 1.0, 1.0].into_iter().collect();
        let right = all - left;
        assert_eq!(right.count(), 3);
        assert!((right.mean().unwrap() - 8.0 / 3.0).abs() < 1e-12);
        assert_eq!(left + right, all);
        let mean = 10.0 / 6.0;
        let expected: f64 = [0.0, 1.0, 1.0, 2.0, 3.0, 3.0]
            .iter()
            .map(|v: &f64| (v - mean).powi(2))
            .sum();
        assert!((all.squared_error() - expected).abs() < 1e-12);
        assert!(left.squared_error() + right.squared_error() < all.squared_error());
    }
}
