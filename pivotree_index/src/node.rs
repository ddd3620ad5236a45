// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree nodes and the per-child bounds partition strategies store on them.
//!
//! Nodes are immutable once built. Children are referenced through [`NodeId`]
//! handles so a node store can page nodes in on demand.

use alloc::vec::Vec;

use crate::config::SearchConfig;
use crate::types::{Matrix, NodeId, ObjectId};

/// What the search does with one child of a visited internal node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchAction {
    /// No member can lie within the radius.
    Exclude,
    /// Visit the child.
    Recurse,
    /// Every member lies within the radius; report all of them unchecked.
    IncludeAll,
    /// Check every member against the query directly, skipping the subtree's bounds.
    NeedsLinearScan,
}

/// A node of the index tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Node {
    /// Partitioned node with bounded children.
    Internal(InternalNode),
    /// Terminal pivot table.
    Leaf(LeafNode),
}

impl Node {
    /// Pivots whose distance to the query the search resolves at this node.
    pub fn pivots(&self) -> &[ObjectId] {
        match self {
            Self::Internal(n) => &n.pivots,
            Self::Leaf(n) => &n.pivots,
        }
    }

    /// Pivots that were taken out of this node's own subset.
    pub fn residents(&self) -> &[ObjectId] {
        match self {
            Self::Internal(n) => &n.residents,
            Self::Leaf(n) => &n.residents,
        }
    }

    /// Size of the subset this node was built from.
    pub fn size(&self) -> usize {
        match self {
            Self::Internal(n) => n.size,
            Self::Leaf(n) => n.residents.len() + n.points.len(),
        }
    }

    /// Child handles; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Self::Internal(n) => &n.children,
            Self::Leaf(_) => &[],
        }
    }
}

/// Internal node: pivots, children and the bounds that let search skip them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InternalNode {
    /// Pivots the bounds are expressed against.
    pub pivots: Vec<ObjectId>,
    /// Subset of `pivots` removed from this node's subset.
    pub residents: Vec<ObjectId>,
    /// Children, in partition order.
    pub children: Vec<NodeId>,
    /// Per-child bounds; `bounds.len() == children.len()`.
    pub bounds: NodeBounds,
    /// Size of the subset this node was built from, residents included.
    pub size: usize,
}

/// Leaf node: points with their precomputed distances to the leaf's pivots.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeafNode {
    /// Pivots of the triangle-inequality filter.
    pub pivots: Vec<ObjectId>,
    /// Subset of `pivots` removed from this leaf's subset.
    pub residents: Vec<ObjectId>,
    /// Stored points.
    pub points: Vec<ObjectId>,
    /// `points.len() × pivots.len()` point-to-pivot distances.
    pub distances: Matrix,
}

/// Per-child bounds, one variant per partition shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeBounds {
    /// Balanced pivot-distance split.
    Balanced(IntervalBounds),
    /// Per-pivot k-means split.
    Clustering(IntervalBounds),
    /// Two-pivot nearest assignment.
    Gh(GhBounds),
    /// Nearest-of-k assignment.
    Gnat(GnatBounds),
    /// Pivot-space centroids or medoids.
    Pct(PctBounds),
    /// Hyperplane projections.
    Cp(CpBounds),
}

impl NodeBounds {
    /// Number of children described.
    pub fn len(&self) -> usize {
        match self {
            Self::Balanced(b) | Self::Clustering(b) => b.lower.rows(),
            Self::Gh(b) => b.sides.len(),
            Self::Gnat(b) => b.owners.len(),
            Self::Pct(b) => b.centroids.rows(),
            Self::Cp(b) => b.lower.rows(),
        }
    }

    /// Whether no child is described.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decide an action for every child.
    ///
    /// `query_distances[i]` is the query's distance to pivot `i`. The result is
    /// written to `out`, one entry per child, in child order.
    pub fn classify(
        &self,
        query_distances: &[f64],
        radius: f64,
        config: &SearchConfig,
        out: &mut Vec<SearchAction>,
    ) {
        out.clear();
        match self {
            Self::Balanced(b) | Self::Clustering(b) => {
                b.classify(query_distances, radius, config, out);
            }
            Self::Gh(b) => b.classify(query_distances, radius, out),
            Self::Gnat(b) => b.classify(query_distances, radius, config, out),
            Self::Pct(b) => b.classify(query_distances, radius, config, out),
            Self::Cp(b) => b.classify(query_distances, radius, config, out),
        }
        assert_eq!(out.len(), self.len(), "one action per child");
    }
}

/// `[lower, upper]` distance interval per child and pivot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalBounds {
    /// `children × pivots` lower bounds.
    pub lower: Matrix,
    /// `children × pivots` upper bounds.
    pub upper: Matrix,
}

/// Which of the two pivots each child is closer to.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GhBounds {
    /// `0` when the child holds points strictly closer to pivot 0, else `1`.
    pub sides: Vec<u8>,
}

/// Cross-range matrix of the nearest-of-k assignment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GnatBounds {
    /// Pivot index each child was grouped around.
    pub owners: Vec<usize>,
    /// `children × pivots` minimum distance from the child's members to each pivot.
    pub lower: Matrix,
    /// `children × pivots` maximum distance from the child's members to each pivot.
    pub upper: Matrix,
    /// Maximum distance from each child's members to its own pivot.
    pub radius: Vec<f64>,
}

/// Pivot-space clusters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PctBounds {
    /// `children × pivots` centroid (or medoid) coordinates.
    pub centroids: Matrix,
    /// Maximum Euclidean distance from a member's coordinates to its centroid.
    pub radius: Vec<f64>,
    /// `children × pivots` minimum member coordinate.
    pub lower: Matrix,
    /// `children × pivots` maximum member coordinate.
    pub upper: Matrix,
}

/// Projection intervals over a group of normal vectors.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpBounds {
    /// `vectors × pivots` unit normal vectors.
    pub vectors: Matrix,
    /// `children × vectors` minimum member projection.
    pub lower: Matrix,
    /// `children × vectors` maximum member projection.
    pub upper: Matrix,
    /// `children × pivots` largest member distance to each pivot.
    pub longest: Matrix,
}
