// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Distance functions.
//!
//! Every pruning rule in this crate relies on the metric honoring the triangle
//! inequality. A function that violates it still builds and searches, but results
//! may silently miss matches.

use core::fmt::Debug;

use crate::math;

/// A distance function over objects of type `O`.
///
/// Implementations must be non-negative, symmetric, return `0` for identical
/// objects and satisfy the triangle inequality. They must also be free of side
/// effects so a built tree can be searched from several threads.
pub trait Metric<O: ?Sized> {
    /// Distance between `a` and `b`.
    fn distance(&self, a: &O, b: &O) -> f64;
}

impl<O: ?Sized, M: Metric<O> + ?Sized> Metric<O> for &M {
    fn distance(&self, a: &O, b: &O) -> f64 {
        (**self).distance(a, b)
    }
}

/// Adapts a closure into a [`Metric`].
#[derive(Clone, Copy)]
pub struct MetricFn<F>(pub F);

impl<O: ?Sized, F: Fn(&O, &O) -> f64> Metric<O> for MetricFn<F> {
    fn distance(&self, a: &O, b: &O) -> f64 {
        (self.0)(a, b)
    }
}

impl<F> Debug for MetricFn<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MetricFn").finish_non_exhaustive()
    }
}

/// The `L_p` family over coordinate vectors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Minkowski {
    /// `Σ |a_i - b_i|`.
    Manhattan,
    /// `sqrt(Σ (a_i - b_i)²)`.
    Euclidean,
    /// `max |a_i - b_i|`.
    Chebyshev,
    /// `(Σ |a_i - b_i|^p)^(1/p)` for `p >= 1`.
    P(f64),
}

impl<O: AsRef<[f64]> + ?Sized> Metric<O> for Minkowski {
    fn distance(&self, a: &O, b: &O) -> f64 {
        let a = a.as_ref();
        let b = b.as_ref();
        debug_assert_eq!(a.len(), b.len(), "vectors must share a dimension");
        let diffs = a.iter().zip(b).map(|(x, y)| math::abs(x - y));
        match *self {
            Self::Manhattan => diffs.sum(),
            Self::Euclidean => math::sqrt(diffs.map(|d| d * d).sum()),
            Self::Chebyshev => diffs.fold(0.0, f64::max),
            Self::P(p) => math::powf(diffs.map(|d| math::powf(d, p)).sum(), 1.0 / p),
        }
    }
}
