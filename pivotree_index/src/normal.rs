// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Candidate normal vectors for hyperplane projection.
//!
//! A pool of unit vectors in pivot space is drawn from the enabled
//! [`CandidateSources`], with near-parallel and opposite duplicates removed.
//! Groups are `k`-subsets of the pool; the CP strategy scores every group and
//! keeps the best one.

use alloc::collections::BinaryHeap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::config::{CandidateSources, CpConfig};
use crate::linalg;
use crate::math;
use crate::types::{Matrix, cmp_f64};

const PARALLEL_EPSILON: f64 = 1e-9;

/// Unit candidate vectors, one per row, in source order PCA, DIAGONAL, AXIS, SPHERE.
///
/// If the enabled sources yield fewer than `k` directions, the axis vectors are
/// appended so at least one group exists.
pub(crate) fn candidates(coords: &Matrix, cfg: &CpConfig) -> Matrix {
    let k = coords.cols();
    let mut pool = Matrix::with_cols(k);
    if cfg.sources.contains(CandidateSources::PCA) {
        let (_, vectors) = linalg::symmetric_eigen(&linalg::covariance(coords));
        for v in vectors.iter_rows() {
            push_unique(&mut pool, v.to_vec());
        }
    }
    if cfg.sources.contains(CandidateSources::DIAGONAL) {
        for v in diagonal(k) {
            push_unique(&mut pool, v);
        }
    }
    if cfg.sources.contains(CandidateSources::AXIS) {
        for v in axis(k) {
            push_unique(&mut pool, v);
        }
    }
    if cfg.sources.contains(CandidateSources::SPHERE) && k == 3 {
        for v in hemisphere(cfg.sphere.steps, cfg.sphere.step) {
            push_unique(&mut pool, v);
        }
    }
    if pool.rows() < k {
        for v in axis(k) {
            push_unique(&mut pool, v);
        }
    }
    pool
}

fn axis(k: usize) -> Vec<Vec<f64>> {
    (0..k)
        .map(|i| {
            let mut v = vec![0.0; k];
            v[i] = 1.0;
            v
        })
        .collect()
}

/// `e_i - e_{i+1}` for consecutive axes, closed by `e_0 + e_{k-1}`.
fn diagonal(k: usize) -> Vec<Vec<f64>> {
    if k < 2 {
        return axis(k);
    }
    let mut out = Vec::with_capacity(k);
    for i in 0..k - 1 {
        let mut v = vec![0.0; k];
        v[i] = 1.0;
        v[i + 1] = -1.0;
        out.push(v);
    }
    let mut closing = vec![0.0; k];
    closing[0] = 1.0;
    closing[k - 1] = 1.0;
    out.push(closing);
    for v in &mut out {
        linalg::normalize(v);
    }
    out
}

fn hemisphere(steps: usize, step: f64) -> Vec<Vec<f64>> {
    let mut out = Vec::new();
    for i in 0..steps {
        for j in 0..steps {
            let x = i as f64 * step;
            let y = j as f64 * step;
            let rho = x * x + y * y;
            if rho > 1.0 {
                continue;
            }
            let s = math::sqrt(1.0 - rho);
            let z = 1.0 - 2.0 * rho;
            if z >= 0.0 {
                out.push(vec![2.0 * x * s, 2.0 * y * s, z]);
            }
        }
    }
    out
}

fn push_unique(pool: &mut Matrix, mut v: Vec<f64>) {
    linalg::normalize(&mut v);
    if math::dot(&v, &v) == 0.0 {
        return;
    }
    let parallel = pool
        .iter_rows()
        .any(|p| math::abs(math::abs(math::dot(p, &v)) - 1.0) <= PARALLEL_EPSILON);
    if !parallel {
        pool.push_row(&v);
    }
}

/// Every `k`-subset of `0..n` in lexicographic order.
pub(crate) fn combinations(n: usize, k: usize) -> Combinations {
    Combinations {
        n,
        next: (k > 0 && k <= n).then(|| (0..k).collect()),
    }
}

/// Iterator returned by [`combinations`].
pub(crate) struct Combinations {
    n: usize,
    next: Option<Vec<usize>>,
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let k = current.len();
        // Rightmost position that can still advance.
        if let Some(i) = (0..k).rev().find(|&i| current[i] < self.n - k + i) {
            let mut following = current.clone();
            following[i] += 1;
            for j in i + 1..k {
                following[j] = following[j - 1] + 1;
            }
            self.next = Some(following);
        }
        Some(current)
    }
}

/// Sum of `|a_l * b_l|` over every pair of vectors in `group`. Smaller is more orthogonal.
pub(crate) fn extent(pool: &Matrix, group: &[usize]) -> f64 {
    let mut total = 0.0;
    for (x, &a) in group.iter().enumerate() {
        for &b in &group[x + 1..] {
            total += pool
                .row(a)
                .iter()
                .zip(pool.row(b))
                .map(|(p, q)| math::abs(p * q))
                .sum::<f64>();
        }
    }
    total
}

struct Ranked {
    extent: f64,
    group: Vec<usize>,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_f64(&self.extent, &other.extent).then_with(|| self.group.cmp(&other.group))
    }
}

/// Groups of `k` pool rows to score.
///
/// With `max_groups = Some(n)` only the `n` groups of smallest [`extent`] are
/// kept, ordered by extent and then lexicographically.
pub(crate) fn groups(pool: &Matrix, k: usize, max_groups: Option<usize>) -> Vec<Vec<usize>> {
    let all = combinations(pool.rows(), k);
    let Some(limit) = max_groups else {
        return all.collect();
    };
    let mut best: BinaryHeap<Ranked> = BinaryHeap::with_capacity(limit + 1);
    for group in all {
        best.push(Ranked {
            extent: extent(pool, &group),
            group,
        });
        if best.len() > limit {
            best.pop();
        }
    }
    best.into_sorted_vec().into_iter().map(|r| r.group).collect()
}

/// Range of `a · x` over the cube `center ± r`.
pub(crate) fn projected_interval(a: &[f64], center: &[f64], r: f64) -> (f64, f64) {
    let mid = math::dot(a, center);
    let half = r * a.iter().map(|&x| math::abs(x)).sum::<f64>();
    (mid - half, mid + half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_coords() -> Matrix {
        let mut m = Matrix::with_cols(3);
        for i in 0..4 {
            for j in 0..3 {
                m.push_row(&[f64::from(i), f64::from(j) * 0.5, f64::from(i + j)]);
            }
        }
        m
    }

    fn assert_unit_and_distinct(pool: &Matrix) {
        for (x, a) in pool.iter_rows().enumerate() {
            assert!((math::dot(a, a) - 1.0).abs() < 1e-9, "row {x} is not unit");
            for b in pool.iter_rows().skip(x + 1) {
                assert!(math::dot(a, b).abs() < 1.0 - 1e-9, "parallel rows in pool");
            }
        }
    }

    #[test]
    fn default_sources_deduplicate() {
        let pool = candidates(&grid_coords(), &CpConfig::default());
        assert_unit_and_distinct(&pool);
        // At most PCA 3 + DIAGONAL 3 + AXIS 3.
        assert!(pool.rows() >= 3 && pool.rows() <= 9);
    }

    #[test]
    fn axis_only_is_the_identity() {
        let cfg = CpConfig {
            sources: CandidateSources::AXIS,
            ..CpConfig::default()
        };
        let pool = candidates(&grid_coords(), &cfg);
        assert_eq!(pool.rows(), 3);
        assert_eq!(pool.row(1), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn sphere_needs_three_pivots() {
        let cfg = CpConfig {
            sources: CandidateSources::SPHERE,
            ..CpConfig::default()
        };
        let pool = candidates(&grid_coords(), &cfg);
        assert_unit_and_distinct(&pool);
        assert!(pool.rows() > 3);
        assert!(pool.iter_rows().all(|v| v[2] >= 0.0));

        let mut flat = Matrix::with_cols(2);
        flat.push_row(&[0.0, 1.0]);
        flat.push_row(&[1.0, 0.0]);
        // No sphere for two pivots; the axes stand in.
        assert_eq!(candidates(&flat, &cfg).rows(), 2);
    }

    #[test]
    fn diagonal_matches_generalized_hyperplane() {
        let d = diagonal(2);
        let h = core::f64::consts::FRAC_1_SQRT_2;
        assert!((d[0][0] - h).abs() < 1e-12 && (d[0][1] + h).abs() < 1e-12);
        assert!((d[1][0] - h).abs() < 1e-12 && (d[1][1] - h).abs() < 1e-12);
    }

    #[test]
    fn combinations_are_lexicographic() {
        let pairs: Vec<Vec<usize>> = combinations(4, 2).collect();
        assert_eq!(
            pairs,
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(combinations(3, 3).collect::<Vec<_>>(), vec![vec![0, 1, 2]]);
        assert_eq!(combinations(2, 3).count(), 0);
        assert_eq!(combinations(10, 4).count(), 210);
    }

    #[test]
    fn pruning_keeps_the_most_orthogonal_groups() {
        let h = core::f64::consts::FRAC_1_SQRT_2;
        let mut pool = Matrix::with_cols(2);
        pool.push_row(&[1.0, 0.0]);
        pool.push_row(&[h, h]);
        pool.push_row(&[0.0, 1.0]);
        assert_eq!(groups(&pool, 2, Some(1)), vec![vec![0, 2]]);
        assert_eq!(groups(&pool, 2, None).len(), 3);
        assert_eq!(extent(&pool, &[0, 2]), 0.0);
    }

    #[test]
    fn projected_interval_matches_cube_corners() {
        let a = [0.6, -0.8, 0.0];
        let center = [1.0, 2.0, -3.0];
        let r = 0.5;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for mask in 0_u32..8 {
            let corner: Vec<f64> = center
                .iter()
                .enumerate()
                .map(|(j, &c)| if mask & (1 << j) == 0 { c - r } else { c + r })
                .collect();
            let p = math::dot(&a, &corner);
            lo = lo.min(p);
            hi = hi.max(p);
        }
        let (plo, phi) = projected_interval(&a, &center, r);
        assert!((plo - lo).abs() < 1e-12);
        assert!((phi - hi).abs() < 1e-12);
    }
}
