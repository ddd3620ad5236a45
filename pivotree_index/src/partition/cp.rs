// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hyperplane projection split.
//!
//! Pivot-space points are projected onto a group of `k` normal vectors and the
//! projections are split like pivot distances by the balanced or clustering split.
//! Every candidate group is scored by the share of workload-query work it lets
//! search skip, and the best group is kept.

use alloc::vec::Vec;

use tracing::debug;

use crate::config::{CpConfig, CpSplit, SearchConfig, Workload};
use crate::math;
use crate::metric::Metric;
use crate::node::{CpBounds, IntervalBounds, SearchAction};
use crate::normal;
use crate::partition::{PartitionMetadata, balanced, clustering, coordinates, interval_bounds};
use crate::types::{Matrix, ObjectId, column_extents};

/// Pivot-space points used as queries when scoring groups.
///
/// [`Workload::Subset`] uses `coords` themselves. [`Workload::Neighborhood`]
/// maps every object of the dataset to pivot space and keeps those within
/// `workload_radius` (per coordinate) of the bounding box of `coords`.
pub(crate) fn workload_points<O, M: Metric<O> + ?Sized>(
    cfg: &CpConfig,
    metric: &M,
    objects: &[O],
    pivots: &[ObjectId],
    coords: &Matrix,
) -> Matrix {
    match cfg.workload {
        Workload::Subset => coords.clone(),
        Workload::Neighborhood => {
            let all: Vec<usize> = (0..coords.rows()).collect();
            let (lo, hi) = column_extents(coords, &all);
            let r = cfg.workload_radius;
            let ids: Vec<ObjectId> = (0..objects.len()).map(ObjectId::new).collect();
            let everything = coordinates(metric, objects, pivots, &ids);
            let mut out = Matrix::with_cols(coords.cols());
            for p in everything.iter_rows() {
                let near = p
                    .iter()
                    .enumerate()
                    .all(|(j, &x)| x >= lo[j] - r && x <= hi[j] + r);
                if near {
                    out.push_row(p);
                }
            }
            out
        }
    }
}

/// Split `coords` on the best-scoring normal-vector group.
///
/// Returns the row groups, their bounds, and the score of every evaluated group.
pub(crate) fn split(
    coords: &Matrix,
    workload: &Matrix,
    fanout: usize,
    max_leaf_size: usize,
    cfg: &CpConfig,
) -> (Vec<Vec<usize>>, CpBounds, PartitionMetadata) {
    let k = coords.cols();
    let pool = normal::candidates(coords, cfg);
    let candidates = normal::groups(&pool, k, cfg.max_groups);

    let mut scores = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, Matrix, Vec<Vec<usize>>, IntervalBounds)> = None;
    let mut best_score = f64::NEG_INFINITY;
    for (index, group) in candidates.iter().enumerate() {
        let vectors = pool.select_rows(group);
        let keys = project(coords, &vectors);
        let groups = match cfg.split {
            CpSplit::Balanced => balanced::split(&keys, fanout),
            CpSplit::Clustering => clustering::split(&keys, fanout, max_leaf_size),
        };
        let bounds = interval_bounds(&keys, &groups);
        let score = exclusion_rate(&vectors, &bounds, &groups, workload, cfg.workload_radius);
        scores.push(score);
        // Later groups win ties.
        if score >= best_score {
            best_score = score;
            best = Some((index, vectors, groups, bounds));
        }
    }

    let Some((chosen, vectors, groups, bounds)) = best else {
        // The candidate pool always holds at least `k` vectors, so this only
        // happens without any points to split.
        return (
            Vec::new(),
            CpBounds {
                vectors: Matrix::with_cols(k),
                lower: Matrix::with_cols(k),
                upper: Matrix::with_cols(k),
                longest: Matrix::with_cols(k),
            },
            PartitionMetadata::default(),
        );
    };
    debug!(
        groups = scores.len(),
        pool = pool.rows(),
        chosen,
        exclusion_rate = best_score,
        children = groups.len(),
        "cp split"
    );

    let mut longest = Matrix::with_cols(k);
    for g in &groups {
        let (_, hi) = column_extents(coords, g);
        longest.push_row(&hi);
    }
    let IntervalBounds { lower, upper } = bounds;
    (
        groups,
        CpBounds {
            vectors,
            lower,
            upper,
            longest,
        },
        PartitionMetadata {
            group_scores: scores,
            chosen_group: Some(chosen),
        },
    )
}

/// `points.rows() × vectors.rows()` dot products.
fn project(points: &Matrix, vectors: &Matrix) -> Matrix {
    let mut keys = Matrix::with_cols(vectors.rows());
    let mut row = Vec::with_capacity(vectors.rows());
    for p in points.iter_rows() {
        row.clear();
        row.extend(vectors.iter_rows().map(|v| math::dot(v, p)));
        keys.push_row(&row);
    }
    keys
}

/// Share of child members the workload's queries could skip.
///
/// For each query, the sizes of the children whose projection interval misses
/// the query cube's projection on some vector are summed; the total is divided
/// by `queries × points`.
fn exclusion_rate(
    vectors: &Matrix,
    bounds: &IntervalBounds,
    groups: &[Vec<usize>],
    workload: &Matrix,
    radius: f64,
) -> f64 {
    let n: usize = groups.iter().map(Vec::len).sum();
    if n == 0 || workload.rows() == 0 {
        return 0.0;
    }
    let mut excluded = 0_usize;
    let mut query = Vec::with_capacity(vectors.rows());
    for q in workload.iter_rows() {
        query.clear();
        query.extend(
            vectors
                .iter_rows()
                .map(|v| normal::projected_interval(v, q, radius)),
        );
        for (c, g) in groups.iter().enumerate() {
            if misses(&query, bounds.lower.row(c), bounds.upper.row(c)) {
                excluded += g.len();
            }
        }
    }
    excluded as f64 / (workload.rows() as f64 * n as f64)
}

/// Query and member projections round differently, so a member on the cube
/// boundary may land a few ulps outside the query interval.
const PROJECTION_SLACK: f64 = 1e-9;

fn misses(query: &[(f64, f64)], lower: &[f64], upper: &[f64]) -> bool {
    query
        .iter()
        .zip(lower.iter().zip(upper))
        .any(|(&(lo, hi), (&l, &u))| {
            let slack = PROJECTION_SLACK * (1.0 + math::abs(lo).max(math::abs(hi)));
            lo.max(l) > hi.min(u) + slack
        })
}

impl CpBounds {
    /// Containment first, then projection overlap.
    ///
    /// A child is included whole when `d_j + longest_j <= r` for some pivot
    /// `j`. It is excluded when, for some stored vector, the projection of the
    /// query cube `d ± r` does not meet the child's projection interval.
    pub(crate) fn classify(
        &self,
        d: &[f64],
        r: f64,
        config: &SearchConfig,
        out: &mut Vec<SearchAction>,
    ) {
        let query: Vec<(f64, f64)> = self
            .vectors
            .iter_rows()
            .map(|v| normal::projected_interval(v, d, r))
            .collect();
        for c in 0..self.lower.rows() {
            let contained = config.containment_shortcut
                && self
                    .longest
                    .row(c)
                    .iter()
                    .zip(d)
                    .any(|(&far, &dj)| dj + far <= r);
            out.push(if contained {
                SearchAction::IncludeAll
            } else if misses(&query, self.lower.row(c), self.upper.row(c)) {
                SearchAction::Exclude
            } else {
                SearchAction::Recurse
            });
        }
    }
}
