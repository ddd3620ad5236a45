// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partition strategies.
//!
//! A strategy turns a data subset and its node's pivots into child subsets plus
//! the [`NodeBounds`] that let search reason about those children:
//!
//! - `balanced`: median-balanced split on pivot distances (VP).
//! - `clustering`: per-pivot 1-D k-means, best pivot first.
//! - `gh`: two pivots, nearest one wins.
//! - `gnat`: `k` pivots, nearest one wins, with a cross-range matrix.
//! - `pct`: k-means or k-medoids in pivot space.
//! - `cp`: hyperplane projections onto the best-scoring normal-vector group.
//!
//! Each module also holds the exclusion predicate that consumes its bounds.

use alloc::vec::Vec;

use crate::config::StrategyConfig;
use crate::error::BuildError;
use crate::metric::Metric;
use crate::node::{IntervalBounds, NodeBounds};
use crate::types::{Matrix, ObjectId, column_extents};

mod balanced;
mod clustering;
mod cp;
mod gh;
mod gnat;
mod pct;

/// Output of one partition step.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionResult {
    /// Child subsets, in child order. Never empty.
    pub subsets: Vec<Vec<ObjectId>>,
    /// Bounds, one entry per subset.
    pub bounds: NodeBounds,
    /// Strategy-specific diagnostics.
    pub metadata: PartitionMetadata,
}

/// Diagnostics a strategy may attach to its result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionMetadata {
    /// CP only: exclusion rate of every evaluated normal-vector group, in order.
    pub group_scores: Vec<f64>,
    /// CP only: index into `group_scores` of the kept group.
    pub chosen_group: Option<usize>,
}

/// Partition `data` around `pivots` with `strategy`.
///
/// `data` must not contain the pivots themselves unless they are meant to be
/// partitioned as ordinary members. `fanout` and `max_leaf_size` are interpreted
/// per [`StrategyConfig`]. `objects` is the whole dataset; ids index into it.
pub fn partition<O, M: Metric<O> + ?Sized>(
    strategy: &StrategyConfig,
    metric: &M,
    objects: &[O],
    pivots: &[ObjectId],
    data: &[ObjectId],
    fanout: usize,
    max_leaf_size: usize,
) -> Result<PartitionResult, BuildError> {
    strategy.validate(pivots.len(), fanout)?;
    let coords = coordinates(metric, objects, pivots, data);
    let result = match strategy {
        StrategyConfig::Vp => {
            let groups = balanced::split(&coords, fanout);
            let bounds = interval_bounds(&coords, &groups);
            finish(data, groups, NodeBounds::Balanced(bounds))
        }
        StrategyConfig::Clustering => {
            let groups = clustering::split(&coords, fanout, max_leaf_size);
            let bounds = interval_bounds(&coords, &groups);
            finish(data, groups, NodeBounds::Clustering(bounds))
        }
        StrategyConfig::Gh => {
            let (groups, bounds) = gh::split(&coords);
            finish(data, groups, NodeBounds::Gh(bounds))
        }
        StrategyConfig::Gnat => {
            let (groups, bounds) = gnat::split(&coords);
            finish(data, groups, NodeBounds::Gnat(bounds))
        }
        StrategyConfig::Pct(cfg) => {
            let (groups, bounds) = pct::split(&coords, fanout, cfg);
            finish(data, groups, NodeBounds::Pct(bounds))
        }
        StrategyConfig::Cp(cfg) => {
            let workload = cp::workload_points(cfg, metric, objects, pivots, &coords);
            let (groups, bounds, metadata) =
                cp::split(&coords, &workload, fanout, max_leaf_size, cfg);
            let mut result = finish(data, groups, NodeBounds::Cp(bounds));
            result.metadata = metadata;
            result
        }
    };
    Ok(result)
}

/// `data.len() × pivots.len()` matrix of distances from each object to each pivot.
pub(crate) fn coordinates<O, M: Metric<O> + ?Sized>(
    metric: &M,
    objects: &[O],
    pivots: &[ObjectId],
    data: &[ObjectId],
) -> Matrix {
    let mut out = Matrix::with_cols(pivots.len());
    let mut row = Vec::with_capacity(pivots.len());
    for id in data {
        row.clear();
        let x = &objects[id.index()];
        row.extend(pivots.iter().map(|p| metric.distance(x, &objects[p.index()])));
        out.push_row(&row);
    }
    out
}

/// Exact per-child `[min, max]` of every key column over the child's rows.
pub(crate) fn interval_bounds(keys: &Matrix, groups: &[Vec<usize>]) -> IntervalBounds {
    let mut lower = Matrix::with_cols(keys.cols());
    let mut upper = Matrix::with_cols(keys.cols());
    for g in groups {
        let (lo, hi) = column_extents(keys, g);
        lower.push_row(&lo);
        upper.push_row(&hi);
    }
    IntervalBounds { lower, upper }
}

fn finish(data: &[ObjectId], groups: Vec<Vec<usize>>, bounds: NodeBounds) -> PartitionResult {
    assert_eq!(
        groups.len(),
        bounds.len(),
        "partition produced mismatched subset and bound counts"
    );
    debug_assert!(groups.iter().all(|g| !g.is_empty()), "empty children are dropped");
    let subsets = groups
        .into_iter()
        .map(|g| g.into_iter().map(|r| data[r]).collect())
        .collect();
    PartitionResult {
        subsets,
        bounds,
        metadata: PartitionMetadata::default(),
    }
}
