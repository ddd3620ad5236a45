// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pivot selection.
//!
//! Selection heuristics are collaborators of the index: the builder only needs
//! *some* `k` distinct objects per node. A few simple selectors ship here so the
//! crate is usable on its own.

use alloc::vec::Vec;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::metric::Metric;
use crate::types::ObjectId;

/// Chooses pivots for a node.
pub trait PivotSelector<O> {
    /// Return up to `k` distinct ids drawn from `candidates`.
    ///
    /// `evaluation` is the subset the pivots will partition. In local mode it is
    /// the same slice as `candidates`. Implementations must be deterministic for
    /// identical inputs so repeated builds produce identical trees.
    fn select<M: Metric<O> + ?Sized>(
        &self,
        metric: &M,
        objects: &[O],
        candidates: &[ObjectId],
        evaluation: &[ObjectId],
        k: usize,
    ) -> Vec<ObjectId>;
}

/// Uniform random pivots from a fixed seed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RandomPivots {
    /// Base seed; mixed with the subset shape per call.
    pub seed: u64,
}

impl<O> PivotSelector<O> for RandomPivots {
    fn select<M: Metric<O> + ?Sized>(
        &self,
        _metric: &M,
        _objects: &[O],
        candidates: &[ObjectId],
        evaluation: &[ObjectId],
        k: usize,
    ) -> Vec<ObjectId> {
        let k = k.min(candidates.len());
        let anchor = evaluation.first().map_or(0, |id| id.index() as u64);
        let mut rng = StdRng::seed_from_u64(
            self.seed ^ (anchor << 32) ^ evaluation.len() as u64,
        );
        index::sample(&mut rng, candidates.len(), k)
            .into_iter()
            .map(|i| candidates[i])
            .collect()
    }
}

/// Farthest-first traversal.
///
/// The first pivot is the candidate farthest from the first evaluation object;
/// each next one maximizes its minimum distance to the pivots chosen so far.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FarthestFirst;

impl<O> PivotSelector<O> for FarthestFirst {
    fn select<M: Metric<O> + ?Sized>(
        &self,
        metric: &M,
        objects: &[O],
        candidates: &[ObjectId],
        evaluation: &[ObjectId],
        k: usize,
    ) -> Vec<ObjectId> {
        let k = k.min(candidates.len());
        let mut out = Vec::with_capacity(k);
        if k == 0 {
            return out;
        }
        let anchor = evaluation.first().unwrap_or(&candidates[0]);
        let anchor = &objects[anchor.index()];
        let mut nearest: Vec<f64> = candidates
            .iter()
            .map(|c| metric.distance(anchor, &objects[c.index()]))
            .collect();
        let mut taken = alloc::vec![false; candidates.len()];
        while out.len() < k {
            let mut best: Option<usize> = None;
            for i in 0..candidates.len() {
                if taken[i] {
                    continue;
                }
                if best.is_none_or(|b| nearest[i] > nearest[b]) {
                    best = Some(i);
                }
            }
            let Some(b) = best else { break };
            taken[b] = true;
            out.push(candidates[b]);
            let chosen = &objects[candidates[b].index()];
            for i in 0..candidates.len() {
                if !taken[i] {
                    let d = metric.distance(chosen, &objects[candidates[i].index()]);
                    if d < nearest[i] || out.len() == 1 {
                        nearest[i] = d;
                    }
                }
            }
        }
        out
    }
}

/// The same explicit pivots at every node, filtered to those in `candidates`.
///
/// Pairs naturally with [`PivotMode::Global`](crate::PivotMode::Global).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedPivots(pub Vec<ObjectId>);

impl FixedPivots {
    /// Pivots by their dataset positions. Positions must be in range.
    pub fn from_indices(indices: &[usize]) -> Self {
        Self(indices.iter().map(|&i| ObjectId::new(i)).collect())
    }
}

impl<O> PivotSelector<O> for FixedPivots {
    fn select<M: Metric<O> + ?Sized>(
        &self,
        _metric: &M,
        _objects: &[O],
        candidates: &[ObjectId],
        _evaluation: &[ObjectId],
        k: usize,
    ) -> Vec<ObjectId> {
        self.0
            .iter()
            .copied()
            .filter(|p| candidates.contains(p))
            .take(k)
            .collect()
    }
}
