// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for building and searching.

use thiserror::Error;

use crate::types::NodeId;

/// Failures of an index build.
///
/// Every variant except [`BuildError::TooManyNodes`] is a configuration error
/// and surfaces before any partitioning work starts.
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The dataset has no objects.
    #[error("cannot build an index over an empty dataset")]
    EmptyDataset,
    /// Object ids are 32-bit.
    #[error("dataset of {len} objects exceeds the u32 id space")]
    TooManyObjects {
        /// Number of objects supplied.
        len: usize,
    },
    /// The strategy needs a different number of pivots.
    #[error("{strategy} needs {required} pivot(s), got {got}")]
    InvalidPivotCount {
        /// Strategy name.
        strategy: &'static str,
        /// Human-readable requirement.
        required: &'static str,
        /// Pivot count supplied.
        got: usize,
    },
    /// The strategy cannot use this fanout.
    #[error("{strategy} cannot partition with fanout {fanout}")]
    InvalidFanout {
        /// Strategy name.
        strategy: &'static str,
        /// Fanout supplied.
        fanout: usize,
    },
    /// Leaves must hold at least one point.
    #[error("max_leaf_size must be at least 1")]
    InvalidLeafSize,
    /// The CP exclusion-rate workload needs a positive radius.
    #[error("workload radius must be positive and finite, got {radius}")]
    InvalidWorkloadRadius {
        /// Radius supplied.
        radius: f64,
    },
    /// MIX pivot selection needs at least as many candidates as pivots.
    #[error("{candidates} pivot candidate(s) cannot supply {num_pivots} pivots")]
    NotEnoughCandidates {
        /// Candidate set size.
        candidates: usize,
        /// Pivots per node.
        num_pivots: usize,
    },
    /// CP was configured with every candidate source disabled.
    #[error("no normal-vector candidate source is enabled")]
    NoCandidateSources,
    /// Node ids are 32-bit. PCT boundary duplication can create more nodes
    /// than there are objects.
    #[error("the tree outgrew the u32 node id space")]
    TooManyNodes,
}

/// Failures of a range search. A search either completes or fails as a whole.
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum SearchError {
    /// Radius is negative or NaN.
    #[error("query radius must be a non-negative number, got {radius}")]
    InvalidRadius {
        /// Radius supplied.
        radius: f64,
    },
    /// The node source could not produce a node.
    #[error("node {node:?} is unavailable")]
    NodeUnavailable {
        /// The node that failed to load.
        node: NodeId,
    },
}
