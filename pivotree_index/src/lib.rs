// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=pivotree_index --heading-base-level=0

//! Pivotree Index: a pivot-based metric-space index for range search.
//!
//! Objects of any type are indexed under any [`Metric`] that honors the
//! triangle inequality. Every node of the tree picks a few *pivots*, measures
//! its subset against them, and partitions the subset with one of six
//! strategies:
//!
//! - [`StrategyConfig::Vp`]: median-balanced split on pivot distances.
//! - [`StrategyConfig::Clustering`]: per-pivot 1-D k-means.
//! - [`StrategyConfig::Gh`]: two pivots, the nearer one wins.
//! - [`StrategyConfig::Gnat`]: nearest of `k` pivots, with a cross-range matrix.
//! - [`StrategyConfig::Pct`]: k-means or k-medoids in pivot space.
//! - [`StrategyConfig::Cp`]: hyperplane projections onto a scored group of normal vectors.
//!
//! Each strategy stores the bounds its own exclusion rule needs. A range search
//! walks the tree lazily, classifies every child of a visited node as excluded,
//! fully included, needing a linear scan, or needing recursion, and filters leaf
//! points with precomputed pivot distances before touching the metric.
//!
//! # Example
//!
//! ```rust
//! use pivotree_index::{BuildConfig, FarthestFirst, Minkowski, SearchConfig, StrategyConfig, build_index};
//!
//! let points: Vec<[f64; 2]> = (0..100)
//!     .map(|i| [f64::from(i % 10), f64::from(i / 10)])
//!     .collect();
//! let config = BuildConfig::new(StrategyConfig::Vp).with_max_leaf_size(8);
//! let tree = build_index(&Minkowski::Euclidean, &FarthestFirst, &config, points).unwrap();
//!
//! let query = [4.5, 4.5];
//! let (hits, stats) = tree
//!     .range_query(&Minkowski::Euclidean, &query, 1.0, SearchConfig::default())
//!     .unwrap();
//! assert_eq!(hits.len(), 4);
//! assert!(stats.distance_computations < 100);
//! ```
//!
//! Searches are lazy. [`IndexTree::search`] returns a [`Cursor`] that yields
//! `Result<Hit, SearchError>` items on demand:
//!
//! ```rust
//! use pivotree_index::{BuildConfig, FarthestFirst, Minkowski, SearchConfig, StrategyConfig, build_index};
//!
//! let values: Vec<[f64; 1]> = (0..50).map(|i| [f64::from(i)]).collect();
//! let config = BuildConfig::new(StrategyConfig::Gnat).with_pivots(3);
//! let tree = build_index(&Minkowski::Manhattan, &FarthestFirst, &config, values).unwrap();
//!
//! let query = [10.0];
//! let mut cursor = tree
//!     .search(&Minkowski::Manhattan, &query, 2.0, SearchConfig::default())
//!     .unwrap();
//! let first = cursor.next().unwrap().unwrap();
//! assert!(first.distance.is_none_or(|d| d <= 2.0));
//! assert_eq!(cursor.count() + 1, 5);
//! ```
//!
//! ## Pivot modes
//!
//! [`PivotMode::Local`] picks fresh pivots from every node's own subset.
//! [`PivotMode::Global`] picks one set at the root and reuses it everywhere.
//! [`PivotMode::Mix`] picks a candidate set from the whole dataset once and lets
//! every node choose among the candidates. Objects reached more than once are
//! reported once.
//!
//! ## Storage
//!
//! Search reads nodes through the [`NodeSource`] trait, so nodes can live
//! outside memory. [`IndexTree`] is the in-memory implementation. With the
//! `serde` feature, nodes and handles derive `Serialize` and `Deserialize`.
//!
//! ## Features
//!
//! - `std` (default): float math from `std`.
//! - `libm`: float math from `libm` for `no_std` builds.
//! - `serde`: serialization derives for the tree and its nodes.
//!
//! ### Float semantics
//!
//! Distances must not be NaN. Debug builds may assert.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod cluster;
mod linalg;
mod math;
mod normal;

pub mod config;
pub mod error;
pub mod metric;
pub mod node;
pub mod partition;
pub mod pivot;
pub mod search;
pub mod tree;
pub mod types;

pub use config::{
    BuildConfig, CandidateSources, Clusterer, CpConfig, CpSplit, PctConfig, PivotMode,
    SearchConfig, SphereSampling, StrategyConfig, Workload,
};
pub use error::{BuildError, SearchError};
pub use metric::{Metric, MetricFn, Minkowski};
pub use node::{Node, NodeBounds, SearchAction};
pub use partition::{PartitionMetadata, PartitionResult, partition};
pub use pivot::{FarthestFirst, FixedPivots, PivotSelector, RandomPivots};
pub use search::{Cursor, Hit, SearchStats, range_query, search};
pub use tree::{IndexTree, NodeSource, build_index};
pub use types::{Matrix, NodeId, ObjectId};
