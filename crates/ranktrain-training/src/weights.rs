//! Weight vector operations for coordinate ascent.
//!
//! Weight vectors are indexed by feature column (ascending feature id), the same order the
//! dense feature matrix uses.
//!
//! - **Initialization**: [`uniform`] for the first restart, [`gaussian`] for the others
//! - **Coordinate order**: [`shuffled_order`]
//! - **Normalization**: [`normalize_l1`]

use rand::{Rng, seq::SliceRandom as _};
use rand_distr::StandardNormal;

/// Creates a weight vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use ranktrain_training::weights;
///
/// let weights = weights::from_fn(|i| 1.0 / (i as f64 + 1.0), 4);
/// assert_eq!(weights, vec![1.0, 0.5, 1.0 / 3.0, 0.25]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f64>
where
    F: FnMut(usize) -> f64,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Every weight equal to `1 / len`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn uniform(len: usize) -> Vec<f64> {
    from_fn(|_| 1.0 / len as f64, len)
}

/// Weights drawn independently from `N(0, 1)`.
pub fn gaussian<R>(rng: &mut R, len: usize) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    from_fn(|_| rng.sample(StandardNormal), len)
}

/// The indices `0..len` in random order.
pub fn shuffled_order<R>(rng: &mut R, len: usize) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    let mut order = (0..len).collect::<Vec<_>>();
    order.shuffle(rng);
    order
}

/// Divides every weight by `Σ|w|` so that the absolute values sum to 1.0.
///
/// This is a positive uniform rescale: every document score is multiplied by the same
/// positive factor, so no ranking changes. An all-zero (or non-finite) vector is left
/// unchanged.
///
/// ```
/// use ranktrain_training::weights;
///
/// let mut w = vec![3.0, -1.0];
/// weights::normalize_l1(&mut w);
/// assert_eq!(w, vec![0.75, -0.25]);
/// ```
pub fn normalize_l1(weights: &mut [f64]) {
    let norm = weights.iter().map(|w| w.abs()).sum::<f64>();
    if norm > 0.0 && norm.is_finite() {
        for w in weights {
            *w /= norm;
        }
    }
}
