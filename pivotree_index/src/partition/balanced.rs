// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Median-balanced split on key columns.
//!
//! Keys are distances to pivots for the VP strategy and projections onto normal
//! vectors for the CP strategy. Column `i` refines every cluster produced by
//! columns `0..i` into up to `fanout` sub-clusters, so a node ends up with at
//! most `fanout ^ cols` children. Points sharing a key always stay together.

use alloc::vec::Vec;

use crate::config::SearchConfig;
use crate::node::{IntervalBounds, SearchAction};
use crate::types::{Matrix, cmp_f64};

/// Split the rows of `keys` column by column. Returns non-empty row groups.
pub(crate) fn split(keys: &Matrix, fanout: usize) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    if keys.rows() == 0 {
        return clusters;
    }
    clusters.push((0..keys.rows()).collect());
    for col in 0..keys.cols() {
        let mut next = Vec::with_capacity(clusters.len() * fanout);
        for mut cluster in clusters {
            cluster.sort_by(|&a, &b| cmp_f64(&keys.get(a, col), &keys.get(b, col)));
            split_sorted(&cluster, |r| keys.get(r, col), fanout, &mut next);
        }
        clusters = next;
    }
    clusters
}

/// Cut one sorted cluster into at most `fanout` runs of whole distinct values.
///
/// Each child takes the run of distinct values whose point count is closest to
/// `remaining points / remaining children`. When no more distinct values than
/// children remain, each value becomes its own child; otherwise the last child
/// takes everything left.
fn split_sorted(
    sorted: &[usize],
    key: impl Fn(usize) -> f64,
    fanout: usize,
    out: &mut Vec<Vec<usize>>,
) {
    let n = sorted.len();
    // first[d] = offset of the first point with the d-th distinct key, plus a sentinel.
    let mut first: Vec<usize> = Vec::new();
    for (i, &r) in sorted.iter().enumerate() {
        if i == 0 || key(r) != key(sorted[i - 1]) {
            first.push(i);
        }
    }
    let distinct = first.len();
    first.push(n);

    let mut start = 0;
    let mut made = 0;
    while made + 1 < fanout && distinct - start > fanout - made {
        let median = (n - first[start]) / (fanout - made);
        let target = first[start] + median;
        let mut t = start;
        while first[t + 1] < target {
            t += 1;
        }
        if t != start && first[t + 1] - target >= target - first[t] {
            t -= 1;
        }
        out.push(sorted[first[start]..first[t + 1]].to_vec());
        start = t + 1;
        made += 1;
    }
    if distinct - start <= fanout - made {
        for d in start..distinct {
            out.push(sorted[first[d]..first[d + 1]].to_vec());
        }
    } else {
        out.push(sorted[first[start]..].to_vec());
    }
}

impl IntervalBounds {
    /// Per-pivot interval test: exclude when the query's `[d - r, d + r]` misses
    /// a child's `[lower, upper]` for some pivot; include everything when
    /// `d + upper <= r` for some pivot.
    pub(crate) fn classify(
        &self,
        d: &[f64],
        r: f64,
        config: &SearchConfig,
        out: &mut Vec<SearchAction>,
    ) {
        for c in 0..self.lower.rows() {
            let lower = self.lower.row(c);
            let upper = self.upper.row(c);
            let mut action = SearchAction::Recurse;
            for i in 0..d.len() {
                if d[i] + r < lower[i] || d[i] - r > upper[i] {
                    action = SearchAction::Exclude;
                    break;
                }
                if config.containment_shortcut && d[i] + upper[i] <= r {
                    action = SearchAction::IncludeAll;
                }
            }
            out.push(action);
        }
    }
}
