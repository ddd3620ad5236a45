// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Float functions that need either `std` or `libm`.

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("pivotree_index requires either the `std` or the `libm` feature");

#[cfg(feature = "std")]
pub(crate) fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

#[cfg(all(not(feature = "std"), feature = "libm"))]
pub(crate) fn sqrt(x: f64) -> f64 {
    libm::sqrt(x)
}

#[cfg(feature = "std")]
pub(crate) fn powf(x: f64, p: f64) -> f64 {
    x.powf(p)
}

#[cfg(all(not(feature = "std"), feature = "libm"))]
pub(crate) fn powf(x: f64, p: f64) -> f64 {
    libm::pow(x, p)
}

pub(crate) fn abs(x: f64) -> f64 {
    if x < 0.0 { -x } else { x }
}

/// Dot product of two equal-length slices.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "dot product needs equal lengths");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance.
pub(crate) fn dist_sq(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "distance needs equal lengths");
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance.
pub(crate) fn dist(a: &[f64], b: &[f64]) -> f64 {
    sqrt(dist_sq(a, b))
}
