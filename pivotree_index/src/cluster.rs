// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Euclidean k-means and k-medoids over the rows of a [`Matrix`].
//!
//! Both are used on pivot-space coordinates, never on the original objects.

use alloc::vec;
use alloc::vec::Vec;

use rand::Rng;
use rand::seq::index;

use crate::math;
use crate::types::Matrix;

const PAM_MAX_ROUNDS: usize = 100;

/// Index of the row of `centroids` nearest to `point`, first one on ties.
pub(crate) fn nearest(centroids: &Matrix, point: &[f64]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (c, row) in centroids.iter_rows().enumerate() {
        let d = math::dist_sq(row, point);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// Lloyd's k-means. Returns `min(k, n)` centroids.
///
/// When `k >= n` every point is its own centroid. Otherwise centroids start
/// at `k` distinct random points and iterate until no centroid moves more than
/// `tolerance` or `max_iterations` is reached. A centroid whose cluster empties
/// keeps its previous position.
pub(crate) fn kmeans<R: Rng + ?Sized>(
    points: &Matrix,
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    rng: &mut R,
) -> Matrix {
    let n = points.rows();
    if k >= n {
        return points.clone();
    }
    let seeds: Vec<usize> = index::sample(rng, n, k).into_vec();
    let mut centroids = points.select_rows(&seeds);
    let dim = points.cols();
    for _ in 0..max_iterations {
        let mut sums = Matrix::filled(k, dim, 0.0);
        let mut counts = vec![0_usize; k];
        for row in points.iter_rows() {
            let c = nearest(&centroids, row);
            counts[c] += 1;
            for (s, v) in sums.row_mut(c).iter_mut().zip(row) {
                *s += v;
            }
        }
        let mut shift: f64 = 0.0;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let inv = 1.0 / counts[c] as f64;
            let next: Vec<f64> = sums.row(c).iter().map(|s| s * inv).collect();
            shift = shift.max(math::dist(centroids.row(c), &next));
            centroids.row_mut(c).copy_from_slice(&next);
        }
        if shift <= tolerance {
            break;
        }
    }
    centroids
}

/// Partitioning around medoids. Returns the row indices of `min(k, n)` medoids.
///
/// Alternates assignment to the nearest medoid with re-picking, per cluster,
/// the member that minimizes the total distance to the other members. Stops
/// when the medoid set no longer changes.
pub(crate) fn pam<R: Rng + ?Sized>(points: &Matrix, k: usize, rng: &mut R) -> Vec<usize> {
    let n = points.rows();
    if k >= n {
        return (0..n).collect();
    }
    let mut medoids: Vec<usize> = index::sample(rng, n, k).into_vec();
    medoids.sort_unstable();
    for _ in 0..PAM_MAX_ROUNDS {
        let centers = points.select_rows(&medoids);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (i, row) in points.iter_rows().enumerate() {
            members[nearest(&centers, row)].push(i);
        }
        let mut next = medoids.clone();
        for (c, group) in members.iter().enumerate() {
            let mut best_cost = f64::INFINITY;
            for &candidate in group {
                let cost: f64 = group
                    .iter()
                    .map(|&o| math::dist(points.row(candidate), points.row(o)))
                    .sum();
                if cost < best_cost {
                    best_cost = cost;
                    next[c] = candidate;
                }
            }
        }
        next.sort_unstable();
        if next == medoids {
            break;
        }
        medoids = next;
    }
    medoids
}
