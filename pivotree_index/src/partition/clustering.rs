// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pivot 1-D k-means split.
//!
//! A work queue holds row groups together with the key columns they may still be
//! split on. For the task at the front, every usable column is clustered with a
//! 1-D k-means seeded from histogram peaks; the column yielding the most buckets
//! (ties broken by the smallest `Σ bucket_size²`) is consumed and the buckets
//! become new tasks. Tasks with usable columns and more than `max_leaf_size`
//! rows go to the front, finished tasks to the back. The split ends once the
//! front task has nothing left to split on.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use crate::math;
use crate::types::{Matrix, cmp_f64};

const KMEANS_STOP: f64 = 0.1;
const KMEANS_MAX_ROUNDS: usize = 100;

struct Task {
    rows: Vec<usize>,
    usable: Vec<bool>,
}

impl Task {
    fn can_split(&self, max_leaf_size: usize) -> bool {
        self.rows.len() > max_leaf_size && self.usable.iter().any(|&u| u)
    }
}

/// Split the rows of `keys` into non-empty groups with up to `fanout` buckets per column.
pub(crate) fn split(keys: &Matrix, fanout: usize, max_leaf_size: usize) -> Vec<Vec<usize>> {
    if keys.rows() == 0 {
        return Vec::new();
    }
    let mut queue = VecDeque::new();
    queue.push_back(Task {
        rows: (0..keys.rows()).collect(),
        usable: vec![true; keys.cols()],
    });
    while let Some(task) = queue.pop_front() {
        if !task.can_split(max_leaf_size) {
            queue.push_front(task);
            break;
        }
        let Task { rows, mut usable } = task;
        let Some((col, buckets)) = best_column(keys, &rows, &usable, fanout) else {
            usable.iter_mut().for_each(|u| *u = false);
            queue.push_back(Task { rows, usable });
            continue;
        };
        usable[col] = false;
        let mut front = Vec::new();
        for bucket in buckets {
            let child = Task {
                rows: bucket,
                usable: usable.clone(),
            };
            if child.can_split(max_leaf_size) {
                front.push(child);
            } else {
                queue.push_back(child);
            }
        }
        for child in front.into_iter().rev() {
            queue.push_front(child);
        }
    }
    queue.into_iter().map(|t| t.rows).collect()
}

/// Cluster `rows` on every usable column and keep the best split.
///
/// Returns `None` when no column separates the rows into two or more buckets.
fn best_column(
    keys: &Matrix,
    rows: &[usize],
    usable: &[bool],
    fanout: usize,
) -> Option<(usize, Vec<Vec<usize>>)> {
    let mut best: Option<(usize, Vec<Vec<usize>>, usize)> = None;
    let mut best_count = 0;
    for col in (0..keys.cols()).filter(|&c| usable[c]) {
        let values: Vec<f64> = rows.iter().map(|&r| keys.get(r, col)).collect();
        let mut means = initial_means(&values, fanout);
        if means.len() < fanout {
            // Every distinct value is already a mean; a column that cannot reach
            // the current best bucket count is not worth considering.
            if best_count > means.len() {
                continue;
            }
        } else {
            kmeans_1d(&values, &mut means);
        }
        let buckets = assign(rows, &values, &means);
        if buckets.len() < 2 {
            continue;
        }
        let spread: usize = buckets.iter().map(|b| b.len() * b.len()).sum();
        let better = match &best {
            None => true,
            Some((_, b, s)) => buckets.len() > b.len() || (buckets.len() == b.len() && spread < *s),
        };
        if better {
            best_count = buckets.len();
            best = Some((col, buckets, spread));
        }
    }
    best.map(|(c, b, _)| (c, b))
}

/// Bucket rows by the midpoints between sorted means. Empty buckets are dropped.
fn assign(rows: &[usize], values: &[f64], means: &[f64]) -> Vec<Vec<usize>> {
    let splits: Vec<f64> = means.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); means.len()];
    for (&r, &v) in rows.iter().zip(values) {
        let b = splits.iter().take_while(|&&s| v >= s).count();
        buckets[b].push(r);
    }
    buckets.retain(|b| !b.is_empty());
    buckets
}

/// Lloyd iterations on one dimension, starting from sorted distinct `means`.
///
/// Stops once the relative change of `Σ means` drops to 10% after at least two
/// rounds. A mean whose bucket empties keeps its value.
fn kmeans_1d(values: &[f64], means: &mut [f64]) {
    let k = means.len();
    let mut sum: f64 = means.iter().sum();
    for round in 0..KMEANS_MAX_ROUNDS {
        means.sort_by(cmp_f64);
        let splits: Vec<f64> = means.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
        let mut totals = vec![0.0; k];
        let mut counts = vec![0_usize; k];
        for &v in values {
            let b = splits.iter().take_while(|&&s| v >= s).count();
            totals[b] += v;
            counts[b] += 1;
        }
        for b in 0..k {
            if counts[b] > 0 {
                means[b] = totals[b] / counts[b] as f64;
            }
        }
        let next: f64 = means.iter().sum();
        let change = if sum == 0.0 {
            math::abs(next)
        } else {
            math::abs(next - sum) / math::abs(sum)
        };
        sum = next;
        if round >= 1 && change <= KMEANS_STOP {
            break;
        }
    }
    means.sort_by(cmp_f64);
}

/// Up to `k` distinct seed values from the peaks of a histogram of `values`.
///
/// Uses `max(min(n / 10, 50k), k)` buckets. Runs of equal local maxima collapse
/// to their middle bucket. With at least `k` peaks the centers of the `k` fullest
/// peak buckets are returned; otherwise one actual value per peak is topped up
/// with further distinct values. Fewer than `k` results means `values` has fewer
/// than `k` distinct entries, and all of them are returned.
fn initial_means(values: &[f64], k: usize) -> Vec<f64> {
    let n = values.len();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if n == 0 {
        return Vec::new();
    }
    if min == max {
        return vec![min];
    }
    let buckets = (n / 10).min(50 * k).max(k);
    let width = (max - min) / buckets as f64;
    let slot = |v: f64| -> usize {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "The quotient is non-negative and clamped to the bucket count."
        )]
        let s = ((v - min) / width) as usize;
        s.min(buckets - 1)
    };
    let mut counts = vec![0_usize; buckets];
    for &v in values {
        counts[slot(v)] += 1;
    }

    let mut peaks: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < buckets {
        let left = if i == 0 { 0 } else { counts[i - 1] };
        if counts[i] == 0 || counts[i] < left {
            i += 1;
            continue;
        }
        // Extend over a plateau of equal counts.
        let mut j = i;
        while j + 1 < buckets && counts[j + 1] == counts[i] {
            j += 1;
        }
        let right = if j + 1 < buckets { counts[j + 1] } else { 0 };
        if counts[i] >= right {
            peaks.push((i + j) / 2);
        }
        i = j + 1;
    }

    let mut means: Vec<f64> = Vec::with_capacity(k);
    if peaks.len() >= k {
        peaks.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));
        means.extend(
            peaks[..k]
                .iter()
                .map(|&p| min + (p as f64 + 0.5) * width),
        );
    } else {
        for &p in &peaks {
            if let Some(&v) = values.iter().find(|&&v| slot(v) == p)
                && !means.contains(&v)
            {
                means.push(v);
            }
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(cmp_f64);
        sorted.dedup();
        for v in sorted {
            if means.len() >= k {
                break;
            }
            if !means.contains(&v) {
                means.push(v);
            }
        }
    }
    means.sort_by(cmp_f64);
    means
}
