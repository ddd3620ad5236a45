// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The index tree: an arena of [`Node`]s over an owned dataset, and its builder.

use alloc::borrow::Cow;
use alloc::vec;
use alloc::vec::Vec;

use tracing::{debug, trace};

use crate::config::{BuildConfig, PivotMode, SearchConfig};
use crate::error::{BuildError, SearchError};
use crate::metric::Metric;
use crate::node::{InternalNode, LeafNode, Node, NodeBounds};
use crate::partition::{coordinates, partition};
use crate::pivot::PivotSelector;
use crate::search::{self, Cursor, Hit, SearchStats};
use crate::types::{NodeId, ObjectId};

/// Where search reads nodes from.
///
/// [`IndexTree`] serves nodes from memory. Other implementations may page nodes
/// in from elsewhere; a failed load aborts the search with
/// [`SearchError::NodeUnavailable`] or an error of the source's choosing.
pub trait NodeSource {
    /// Root handle, or `None` for an empty store.
    fn root(&self) -> Option<NodeId>;

    /// Fetch one node.
    fn load(&self, id: NodeId) -> Result<Cow<'_, Node>, SearchError>;
}

/// A built index. Owns its dataset; nodes refer to objects by [`ObjectId`].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexTree<O> {
    objects: Vec<O>,
    nodes: Vec<Node>,
    root: NodeId,
    depth: usize,
}

impl<O> IndexTree<O> {
    /// The dataset, in id order.
    pub fn objects(&self) -> &[O] {
        &self.objects
    }

    /// One object by id.
    pub fn object(&self, id: ObjectId) -> Option<&O> {
        self.objects.get(id.index())
    }

    /// One node by handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.get())
    }

    /// Root handle.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always `false`: building rejects empty datasets.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Length of the longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Lazily search for every object within `radius` of `query`.
    pub fn search<'a, M: Metric<O> + ?Sized>(
        &'a self,
        metric: &'a M,
        query: &'a O,
        radius: f64,
        config: SearchConfig,
    ) -> Result<Cursor<'a, O, M, Self>, SearchError> {
        search::search(self, &self.objects, metric, query, radius, config)
    }

    /// Collect every object within `radius` of `query`.
    pub fn range_query<'a, M: Metric<O> + ?Sized>(
        &'a self,
        metric: &'a M,
        query: &'a O,
        radius: f64,
        config: SearchConfig,
    ) -> Result<(Vec<Hit<'a, O>>, SearchStats), SearchError> {
        search::range_query(self, &self.objects, metric, query, radius, config)
    }

    /// Consume the tree and return the dataset.
    pub fn into_objects(self) -> Vec<O> {
        self.objects
    }
}

impl<O> NodeSource for IndexTree<O> {
    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn load(&self, id: NodeId) -> Result<Cow<'_, Node>, SearchError> {
        self.nodes
            .get(id.get())
            .map(Cow::Borrowed)
            .ok_or(SearchError::NodeUnavailable { node: id })
    }
}

/// Build an index over `dataset`.
///
/// Every node picks pivots with `selector` according to [`BuildConfig::mode`],
/// sets aside the pivots that belong to its own subset, and partitions the rest
/// with [`BuildConfig::strategy`]. A subset becomes a leaf once it holds no more
/// than [`BuildConfig::max_leaf_size`] points, when the selector cannot supply
/// enough pivots, when it is no smaller than its parent's remaining subset, or
/// when partitioning would leave some child with every remaining point.
///
/// Configuration problems are reported before any distance is computed.
pub fn build_index<O, M, P>(
    metric: &M,
    selector: &P,
    config: &BuildConfig,
    dataset: Vec<O>,
) -> Result<IndexTree<O>, BuildError>
where
    M: Metric<O> + ?Sized,
    P: PivotSelector<O> + ?Sized,
{
    config.validate(dataset.len())?;
    let all: Vec<ObjectId> = (0..dataset.len()).map(ObjectId::new).collect();
    let shared = match config.mode {
        PivotMode::Local => Vec::new(),
        PivotMode::Global => selector.select(metric, &dataset, &all, &all, config.num_pivots),
        PivotMode::Mix { candidates } => {
            selector.select(metric, &dataset, &all, &all, candidates)
        }
    };
    let mut builder = Builder {
        metric,
        selector,
        config,
        objects: &dataset,
        shared,
        nodes: Vec::new(),
        leaves: 0,
        depth: 0,
    };
    let root = builder.build(all, usize::MAX, 0)?;
    let Builder {
        nodes,
        leaves,
        depth,
        ..
    } = builder;
    debug!(
        objects = dataset.len(),
        nodes = nodes.len(),
        leaves,
        depth,
        strategy = config.strategy.name(),
        "built index"
    );
    Ok(IndexTree {
        objects: dataset,
        nodes,
        root,
        depth,
    })
}

struct Builder<'a, O, M: ?Sized, P: ?Sized> {
    metric: &'a M,
    selector: &'a P,
    config: &'a BuildConfig,
    objects: &'a [O],
    /// Global pivots, or MIX candidates.
    shared: Vec<ObjectId>,
    nodes: Vec<Node>,
    leaves: usize,
    depth: usize,
}

/// Pending work of the builder.
enum Task {
    Build {
        subset: Vec<ObjectId>,
        limit: usize,
        depth: usize,
    },
    /// Assemble an internal node from the last `children` built subtrees.
    Join {
        pivots: Vec<ObjectId>,
        residents: Vec<ObjectId>,
        bounds: NodeBounds,
        size: usize,
        children: usize,
        depth: usize,
    },
}

impl<O, M, P> Builder<'_, O, M, P>
where
    M: Metric<O> + ?Sized,
    P: PivotSelector<O> + ?Sized,
{
    fn pivots_for(&self, subset: &[ObjectId]) -> Vec<ObjectId> {
        let k = self.config.num_pivots;
        let mut pivots = match self.config.mode {
            PivotMode::Local => self.selector.select(self.metric, self.objects, subset, subset, k),
            PivotMode::Global => self.shared.clone(),
            PivotMode::Mix { .. } => {
                self.selector
                    .select(self.metric, self.objects, &self.shared, subset, k)
            }
        };
        pivots.truncate(k);
        pivots
    }

    /// Build the subtree for `subset` and return its root.
    ///
    /// Children are pushed into the arena before their parent. `limit` is the
    /// remaining subset size of the node that produced a subset.
    fn build(
        &mut self,
        subset: Vec<ObjectId>,
        limit: usize,
        depth: usize,
    ) -> Result<NodeId, BuildError> {
        let cfg = self.config;
        let mut tasks = vec![Task::Build {
            subset,
            limit,
            depth,
        }];
        let mut built: Vec<NodeId> = Vec::new();
        while let Some(task) = tasks.pop() {
            match task {
                Task::Build {
                    subset,
                    limit,
                    depth,
                } => {
                    self.depth = self.depth.max(depth);
                    let pivots = self.pivots_for(&subset);
                    let size = subset.len();
                    let (residents, rest): (Vec<ObjectId>, Vec<ObjectId>) =
                        subset.into_iter().partition(|id| pivots.contains(id));

                    let splittable = rest.len() > cfg.max_leaf_size
                        && rest.len() < limit
                        && pivots.len() >= cfg.num_pivots;
                    if !splittable {
                        built.push(self.leaf(pivots, residents, rest, depth, size)?);
                        continue;
                    }

                    let result = partition(
                        &cfg.strategy,
                        self.metric,
                        self.objects,
                        &pivots,
                        &rest,
                        cfg.fanout,
                        cfg.max_leaf_size,
                    )?;
                    // A child holding every remaining point separates nothing.
                    if result.subsets.iter().any(|child| child.len() >= rest.len()) {
                        built.push(self.leaf(pivots, residents, rest, depth, size)?);
                        continue;
                    }
                    tasks.push(Task::Join {
                        pivots,
                        residents,
                        bounds: result.bounds,
                        size,
                        children: result.subsets.len(),
                        depth,
                    });
                    let limit = rest.len();
                    tasks.extend(result.subsets.into_iter().rev().map(|child| Task::Build {
                        subset: child,
                        limit,
                        depth: depth + 1,
                    }));
                }
                Task::Join {
                    pivots,
                    residents,
                    bounds,
                    size,
                    children,
                    depth,
                } => {
                    let children = built.split_off(built.len() - children);
                    trace!(depth, size, children = children.len(), "internal node");
                    built.push(self.push(Node::Internal(InternalNode {
                        pivots,
                        residents,
                        children,
                        bounds,
                        size,
                    }))?);
                }
            }
        }
        debug_assert_eq!(built.len(), 1, "a build yields exactly one root");
        Ok(built[0])
    }

    fn leaf(
        &mut self,
        pivots: Vec<ObjectId>,
        residents: Vec<ObjectId>,
        points: Vec<ObjectId>,
        depth: usize,
        size: usize,
    ) -> Result<NodeId, BuildError> {
        let distances = coordinates(self.metric, self.objects, &pivots, &points);
        trace!(depth, size, points = points.len(), "leaf node");
        self.leaves += 1;
        self.push(Node::Leaf(LeafNode {
            pivots,
            residents,
            points,
            distances,
        }))
    }

    fn push(&mut self, node: Node) -> Result<NodeId, BuildError> {
        if u32::try_from(self.nodes.len()).is_err() {
            return Err(BuildError::TooManyNodes);
        }
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        Ok(id)
    }
}
