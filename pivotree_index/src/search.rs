// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Range search over any [`NodeSource`].
//!
//! The search is a lazy depth-first walk. At every visited node the query's
//! distance to each pivot is resolved once (and remembered for the rest of the
//! query); internal nodes hand those distances to their bounds to classify
//! every child, and leaves filter their points with the triangle inequality
//! before computing exact distances.
//!
//! An object can be reached more than once, for example as a pivot at two
//! levels or as a duplicated cluster member. It is reported only the first time.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use tracing::trace;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::math;
use crate::metric::Metric;
use crate::node::{LeafNode, Node, SearchAction};
use crate::tree::NodeSource;
use crate::types::{NodeId, ObjectId};

/// One reported object.
#[derive(Debug, PartialEq)]
pub struct Hit<'a, O> {
    /// Object id.
    pub id: ObjectId,
    /// The object itself.
    pub object: &'a O,
    /// Exact distance to the query, or `None` when the object was reported
    /// through a containment shortcut without its distance being computed.
    pub distance: Option<f64>,
}

impl<O> Clone for Hit<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for Hit<'_, O> {}

/// Counters collected while a search runs.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SearchStats {
    /// Internal nodes whose children were classified.
    pub internal_node_visits: usize,
    /// Leaves whose points were filtered.
    pub leaf_node_visits: usize,
    /// Calls to the metric.
    pub distance_computations: usize,
    exclusion_sum: f64,
    prune_sum: f64,
}

impl SearchStats {
    /// Internal and leaf visits combined.
    pub fn node_visits(&self) -> usize {
        self.internal_node_visits + self.leaf_node_visits
    }

    /// Mean over visited internal nodes of the share of the node's members that
    /// did not have to be descended into. `0.0` when no internal node was visited.
    pub fn exclusion_rate(&self) -> f64 {
        self.mean(self.exclusion_sum)
    }

    /// Mean over visited internal nodes of `1 - recursed_children / children`.
    /// `0.0` when no internal node was visited.
    pub fn prune_rate(&self) -> f64 {
        self.mean(self.prune_sum)
    }

    fn mean(&self, sum: f64) -> f64 {
        if self.internal_node_visits == 0 {
            0.0
        } else {
            sum / self.internal_node_visits as f64
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Frame {
    /// Visit a node. `parent_size` is the size of the internal node that chose
    /// to recurse into it.
    Visit {
        node: NodeId,
        parent_size: Option<usize>,
    },
    /// Report every member unchecked.
    EmitAll(NodeId),
    /// Check every member against the query.
    Scan(NodeId),
}

/// Lazy range search. Yields every object within the radius exactly once.
///
/// After an error the cursor yields that error once and then ends.
pub struct Cursor<'a, O, M: ?Sized, S: ?Sized> {
    source: &'a S,
    objects: &'a [O],
    metric: &'a M,
    query: &'a O,
    radius: f64,
    config: SearchConfig,
    stack: Vec<Frame>,
    pending: VecDeque<Hit<'a, O>>,
    /// Query distance of every object measured so far.
    memo: BTreeMap<ObjectId, f64>,
    emitted: BTreeSet<ObjectId>,
    query_distances: Vec<f64>,
    actions: Vec<SearchAction>,
    stats: SearchStats,
    done: bool,
}

impl<O, M: ?Sized, S: ?Sized> fmt::Debug for Cursor<'_, O, M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("radius", &self.radius)
            .field("config", &self.config)
            .field("stack", &self.stack.len())
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

/// Start a range search for objects within `radius` of `query`.
///
/// `objects` must be the dataset the nodes of `source` were built over. A
/// negative or NaN radius is rejected; a radius of `0` finds exact matches.
pub fn search<'a, O, M, S>(
    source: &'a S,
    objects: &'a [O],
    metric: &'a M,
    query: &'a O,
    radius: f64,
    config: SearchConfig,
) -> Result<Cursor<'a, O, M, S>, SearchError>
where
    M: Metric<O> + ?Sized,
    S: NodeSource + ?Sized,
{
    if radius.is_nan() || radius < 0.0 {
        return Err(SearchError::InvalidRadius { radius });
    }
    let mut stack = Vec::new();
    if let Some(root) = source.root() {
        stack.push(Frame::Visit {
            node: root,
            parent_size: None,
        });
    }
    Ok(Cursor {
        source,
        objects,
        metric,
        query,
        radius,
        config,
        stack,
        pending: VecDeque::new(),
        memo: BTreeMap::new(),
        emitted: BTreeSet::new(),
        query_distances: Vec::new(),
        actions: Vec::new(),
        stats: SearchStats::default(),
        done: false,
    })
}

/// Run a search to completion and collect its hits and statistics.
pub fn range_query<'a, O, M, S>(
    source: &'a S,
    objects: &'a [O],
    metric: &'a M,
    query: &'a O,
    radius: f64,
    config: SearchConfig,
) -> Result<(Vec<Hit<'a, O>>, SearchStats), SearchError>
where
    M: Metric<O> + ?Sized,
    S: NodeSource + ?Sized,
{
    let mut cursor = search(source, objects, metric, query, radius, config)?;
    let mut hits = Vec::new();
    for hit in cursor.by_ref() {
        hits.push(hit?);
    }
    Ok((hits, cursor.stats()))
}

impl<'a, O, M, S> Cursor<'a, O, M, S>
where
    M: Metric<O> + ?Sized,
    S: NodeSource + ?Sized,
{
    /// Statistics so far. Final once the cursor is exhausted.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Query radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn step(&mut self, frame: Frame) -> Result<(), SearchError> {
        // Copy the source reference so loaded nodes borrow `'a`, not `self`.
        let source = self.source;
        match frame {
            Frame::Visit { node, parent_size } => {
                let loaded = source.load(node)?;
                if let Some(parent) = parent_size
                    && parent > 0
                {
                    self.stats.exclusion_sum -= loaded.size() as f64 / parent as f64;
                }
                self.visit(&loaded);
            }
            Frame::EmitAll(node) => {
                let loaded = source.load(node)?;
                for &id in loaded.residents() {
                    self.emit_unchecked(id);
                }
                match &*loaded {
                    Node::Leaf(leaf) => {
                        for &id in &leaf.points {
                            self.emit_unchecked(id);
                        }
                    }
                    Node::Internal(n) => {
                        self.stack
                            .extend(n.children.iter().rev().map(|&c| Frame::EmitAll(c)));
                    }
                }
            }
            Frame::Scan(node) => {
                let loaded = source.load(node)?;
                for &id in loaded.residents() {
                    self.check(id);
                }
                match &*loaded {
                    Node::Leaf(leaf) => {
                        for &id in &leaf.points {
                            self.check(id);
                        }
                    }
                    Node::Internal(n) => {
                        self.stack
                            .extend(n.children.iter().rev().map(|&c| Frame::Scan(c)));
                    }
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, node: &Node) {
        self.resolve_pivots(node.pivots());
        match node {
            Node::Leaf(leaf) => {
                self.stats.leaf_node_visits += 1;
                self.filter_leaf(leaf);
            }
            Node::Internal(n) => {
                self.stats.internal_node_visits += 1;
                let mut actions = mem::take(&mut self.actions);
                n.bounds
                    .classify(&self.query_distances, self.radius, &self.config, &mut actions);
                let mut recursed = 0_usize;
                for (&child, &action) in n.children.iter().zip(&actions).rev() {
                    match action {
                        SearchAction::Exclude => {}
                        SearchAction::Recurse => {
                            recursed += 1;
                            self.stack.push(Frame::Visit {
                                node: child,
                                parent_size: Some(n.size),
                            });
                        }
                        SearchAction::IncludeAll => self.stack.push(Frame::EmitAll(child)),
                        SearchAction::NeedsLinearScan => self.stack.push(Frame::Scan(child)),
                    }
                }
                // Recursed children subtract their share once they are visited.
                self.stats.exclusion_sum += 1.0;
                if !n.children.is_empty() {
                    self.stats.prune_sum += 1.0 - recursed as f64 / n.children.len() as f64;
                }
                self.actions = actions;
            }
        }
    }

    /// Fill `query_distances` for `pivots`, reporting pivots inside the radius.
    fn resolve_pivots(&mut self, pivots: &[ObjectId]) {
        let mut distances = mem::take(&mut self.query_distances);
        distances.clear();
        for &p in pivots {
            let d = self.distance_to(p);
            distances.push(d);
            if d <= self.radius {
                self.emit(p, Some(d));
            }
        }
        self.query_distances = distances;
    }

    fn filter_leaf(&mut self, leaf: &LeafNode) {
        let r = self.radius;
        for (i, &id) in leaf.points.iter().enumerate() {
            if self.emitted.contains(&id) {
                continue;
            }
            let d = match self.memo.get(&id) {
                Some(&d) => d,
                None => {
                    let row = leaf.distances.row(i);
                    let pruned = self
                        .query_distances
                        .iter()
                        .zip(row)
                        .any(|(&q, &x)| math::abs(q - x) > r);
                    if pruned {
                        continue;
                    }
                    self.distance_to(id)
                }
            };
            if d <= r {
                self.emit(id, Some(d));
            }
        }
    }

    fn check(&mut self, id: ObjectId) {
        if self.emitted.contains(&id) {
            return;
        }
        let d = self.distance_to(id);
        if d <= self.radius {
            self.emit(id, Some(d));
        }
    }

    fn emit_unchecked(&mut self, id: ObjectId) {
        let known = self.memo.get(&id).copied();
        self.emit(id, known);
    }

    fn distance_to(&mut self, id: ObjectId) -> f64 {
        if let Some(&d) = self.memo.get(&id) {
            return d;
        }
        let d = self.metric.distance(self.query, &self.objects[id.index()]);
        self.stats.distance_computations += 1;
        self.memo.insert(id, d);
        d
    }

    fn emit(&mut self, id: ObjectId, distance: Option<f64>) {
        if self.emitted.insert(id) {
            let objects = self.objects;
            self.pending.push_back(Hit {
                id,
                object: &objects[id.index()],
                distance,
            });
        }
    }
}

impl<'a, O, M, S> Iterator for Cursor<'a, O, M, S>
where
    M: Metric<O> + ?Sized,
    S: NodeSource + ?Sized,
{
    type Item = Result<Hit<'a, O>, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.pending.pop_front() {
                return Some(Ok(hit));
            }
            if self.done {
                return None;
            }
            let Some(frame) = self.stack.pop() else {
                self.done = true;
                trace!(
                    internal = self.stats.internal_node_visits,
                    leaves = self.stats.leaf_node_visits,
                    distances = self.stats.distance_computations,
                    reported = self.emitted.len(),
                    "range search finished"
                );
                return None;
            };
            if let Err(err) = self.step(frame) {
                self.done = true;
                self.stack.clear();
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

impl<O, M, S> core::iter::FusedIterator for Cursor<'_, O, M, S>
where
    M: Metric<O> + ?Sized,
    S: NodeSource + ?Sized,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, CpConfig, PctConfig, PivotMode, StrategyConfig};
    use crate::metric::Minkowski;
    use crate::pivot::{FarthestFirst, FixedPivots};
    use crate::tree::{IndexTree, build_index};
    use alloc::borrow::Cow;
    use alloc::vec;

    fn brute(data: &[[f64; 2]], q: &[f64; 2], r: f64) -> Vec<ObjectId> {
        (0..data.len())
            .filter(|&i| Minkowski::Euclidean.distance(&data[i], q) <= r)
            .map(ObjectId::new)
            .collect()
    }

    fn ids(hits: &[Hit<'_, [f64; 2]>]) -> Vec<ObjectId> {
        let mut v: Vec<ObjectId> = hits.iter().map(|h| h.id).collect();
        v.sort_unstable();
        v
    }

    fn scatter(n: u32) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| {
                let t = f64::from(i);
                [(t * 7.3) % 10.0, (t * 3.1) % 7.0]
            })
            .collect()
    }

    #[test]
    fn four_points_on_a_line() {
        let data = vec![[0.0, 0.0], [1.0, 0.0], [5.0, 0.0], [6.0, 0.0]];
        let config = BuildConfig::new(StrategyConfig::Vp)
            .with_pivots(1)
            .with_max_leaf_size(1);
        let tree = build_index(
            &Minkowski::Euclidean,
            &FixedPivots::from_indices(&[0]),
            &config,
            data,
        )
        .unwrap();
        let q = [0.5, 0.0];
        let (hits, stats) = tree
            .range_query(&Minkowski::Euclidean, &q, 0.6, SearchConfig::default())
            .unwrap();
        assert_eq!(ids(&hits), vec![ObjectId::new(0), ObjectId::new(1)]);
        assert!(hits.iter().all(|h| h.distance == Some(0.5)));
        assert_eq!(stats.internal_node_visits, 1);
        // The far child [5, 6] is excluded by its distance interval.
        assert!(stats.exclusion_rate() > 0.0);
        assert!(stats.prune_rate() > 0.0);
    }

    #[test]
    fn far_corner_subtree_is_never_visited() {
        let data = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
        let config = BuildConfig::new(StrategyConfig::Vp).with_max_leaf_size(1);
        let tree = build_index(
            &Minkowski::Euclidean,
            &FixedPivots::from_indices(&[0, 1]),
            &config,
            data,
        )
        .unwrap();
        let q = [0.0, 0.0];
        let (hits, stats) = tree
            .range_query(&Minkowski::Euclidean, &q, 1.5, SearchConfig::default())
            .unwrap();
        assert_eq!(
            ids(&hits),
            vec![ObjectId::new(0), ObjectId::new(1), ObjectId::new(2)]
        );
        assert_eq!(stats.internal_node_visits, 1);
        assert_eq!(stats.leaf_node_visits, 0);
        assert!(stats.distance_computations < 4);
    }

    #[test]
    fn four_corner_points_fit_in_one_leaf() {
        // Two pivots leave two points, which fit a leaf of size 2.
        let data = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
        let config = BuildConfig::new(StrategyConfig::Vp)
            .with_pivots(2)
            .with_fanout(2)
            .with_max_leaf_size(2);
        let tree =
            build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.clone()).unwrap();
        assert_eq!(tree.node_count(), 1);
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.pivots(), &[ObjectId::new(3), ObjectId::new(0)]);

        let q = [0.0, 0.0];
        let (hits, stats) = tree
            .range_query(&Minkowski::Euclidean, &q, 1.5, SearchConfig::default())
            .unwrap();
        assert_eq!(ids(&hits), brute(&data, &q, 1.5));
        assert_eq!(
            ids(&hits),
            vec![ObjectId::new(0), ObjectId::new(1), ObjectId::new(2)]
        );
        assert_eq!(stats.internal_node_visits, 0);
        assert_eq!(stats.leaf_node_visits, 1);
        // [5, 5] is only measured as a pivot; nothing is measured twice.
        assert_eq!(stats.distance_computations, data.len());
    }

    #[test]
    fn zero_radius_finds_exact_matches() {
        let data = scatter(40);
        let q = data[17];
        let config = BuildConfig::new(StrategyConfig::Gnat).with_max_leaf_size(3);
        let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.clone())
            .unwrap();
        let (hits, _) = tree
            .range_query(&Minkowski::Euclidean, &q, 0.0, SearchConfig::default())
            .unwrap();
        assert_eq!(ids(&hits), brute(&data, &q, 0.0));
        assert!(ids(&hits).contains(&ObjectId::new(17)));
    }

    #[test]
    fn invalid_radius_is_rejected() {
        let tree = build_index(
            &Minkowski::Euclidean,
            &FarthestFirst,
            &BuildConfig::new(StrategyConfig::Vp),
            scatter(5),
        )
        .unwrap();
        let q = [0.0, 0.0];
        for radius in [-1.0, f64::NAN] {
            let err = tree
                .search(&Minkowski::Euclidean, &q, radius, SearchConfig::default())
                .unwrap_err();
            assert!(matches!(err, SearchError::InvalidRadius { .. }));
        }
    }

    #[test]
    fn radius_covering_everything_returns_everything() {
        let data = scatter(60);
        let q = [5.0, 3.0];
        for strategy in [
            StrategyConfig::Vp,
            StrategyConfig::Gnat,
            StrategyConfig::Pct(PctConfig::default()),
            StrategyConfig::Cp(CpConfig::default()),
        ] {
            let config = BuildConfig::new(strategy).with_max_leaf_size(4);
            let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.clone())
                .unwrap();
            let (hits, _) = tree
                .range_query(&Minkowski::Euclidean, &q, 100.0, SearchConfig::default())
                .unwrap();
            assert_eq!(hits.len(), 60);
            assert_eq!(ids(&hits), brute(&data, &q, 100.0));
        }
    }

    #[test]
    fn containment_reports_without_distances() {
        let data = scatter(60);
        let q = data[0];
        let config = BuildConfig::new(StrategyConfig::Vp).with_max_leaf_size(4);
        let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data).unwrap();
        let (with, fast) = tree
            .range_query(&Minkowski::Euclidean, &q, 100.0, SearchConfig::default())
            .unwrap();
        let plain = SearchConfig {
            containment_shortcut: false,
            ..SearchConfig::default()
        };
        let (without, slow) = tree
            .range_query(&Minkowski::Euclidean, &q, 100.0, plain)
            .unwrap();
        assert_eq!(ids(&with), ids(&without));
        assert!(with.iter().any(|h| h.distance.is_none()));
        assert!(without.iter().all(|h| h.distance.is_some()));
        assert!(fast.distance_computations < slow.distance_computations);
    }

    #[test]
    fn single_point_is_a_lone_leaf() {
        let tree = build_index(
            &Minkowski::Euclidean,
            &FarthestFirst,
            &BuildConfig::new(StrategyConfig::Vp),
            vec![[2.0, 2.0]],
        )
        .unwrap();
        let q = [2.0, 2.5];
        let (hits, stats) = tree
            .range_query(&Minkowski::Euclidean, &q, 1.0, SearchConfig::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, Some(0.5));
        assert_eq!(stats.internal_node_visits, 0);
        assert_eq!(stats.leaf_node_visits, 1);
        assert_eq!(stats.exclusion_rate(), 0.0);
        assert_eq!(stats.prune_rate(), 0.0);
    }

    #[test]
    fn shared_pivots_are_reported_once() {
        let data = scatter(70);
        for mode in [PivotMode::Global, PivotMode::Mix { candidates: 5 }] {
            for strategy in [StrategyConfig::Vp, StrategyConfig::Pct(PctConfig::default())] {
                let config = BuildConfig::new(strategy)
                    .with_max_leaf_size(4)
                    .with_mode(mode);
                let tree =
                    build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data.clone())
                        .unwrap();
                let q = [4.0, 4.0];
                let (hits, stats) = tree
                    .range_query(&Minkowski::Euclidean, &q, 3.0, SearchConfig::default())
                    .unwrap();
                let got: Vec<ObjectId> = hits.iter().map(|h| h.id).collect();
                let mut unique = got.clone();
                unique.sort_unstable();
                unique.dedup();
                assert_eq!(got.len(), unique.len(), "{mode:?} reported a duplicate");
                assert_eq!(unique, brute(&data, &q, 3.0));
                assert!(stats.distance_computations <= data.len());
            }
        }
    }

    struct Flaky<'t> {
        tree: &'t IndexTree<[f64; 2]>,
        broken: NodeId,
    }

    impl NodeSource for Flaky<'_> {
        fn root(&self) -> Option<NodeId> {
            Some(self.tree.root())
        }

        fn load(&self, id: NodeId) -> Result<Cow<'_, Node>, SearchError> {
            if id == self.broken {
                return Err(SearchError::NodeUnavailable { node: id });
            }
            self.tree.load(id)
        }
    }

    #[test]
    fn failing_source_ends_the_cursor() {
        let data = scatter(50);
        let config = BuildConfig::new(StrategyConfig::Vp).with_max_leaf_size(4);
        let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, data).unwrap();
        let source = Flaky {
            tree: &tree,
            broken: tree.root(),
        };
        let q = [1.0, 1.0];
        let mut cursor = search(
            &source,
            tree.objects(),
            &Minkowski::Euclidean,
            &q,
            2.0,
            SearchConfig::default(),
        )
        .unwrap();
        assert_eq!(
            cursor.next(),
            Some(Err(SearchError::NodeUnavailable { node: tree.root() }))
        );
        assert_eq!(cursor.next(), None);
        let err = range_query(
            &source,
            tree.objects(),
            &Minkowski::Euclidean,
            &q,
            2.0,
            SearchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::NodeUnavailable { .. }));
    }

    #[test]
    fn empty_source_yields_nothing() {
        struct Empty;
        impl NodeSource for Empty {
            fn root(&self) -> Option<NodeId> {
                None
            }
            fn load(&self, id: NodeId) -> Result<Cow<'_, Node>, SearchError> {
                Err(SearchError::NodeUnavailable { node: id })
            }
        }
        let objects: [[f64; 2]; 0] = [];
        let q = [0.0, 0.0];
        let (hits, stats) = range_query(
            &Empty,
            &objects,
            &Minkowski::Euclidean,
            &q,
            1.0,
            SearchConfig::default(),
        )
        .unwrap();
        assert!(hits.is_empty());
        assert_eq!(stats.node_visits(), 0);
    }
}
