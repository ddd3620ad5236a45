// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build and search configuration.
//!
//! All knobs are passed explicitly into [`build_index`](crate::build_index) and
//! [`search`](crate::search); nothing is process-wide.

use bitflags::bitflags;

use crate::error::BuildError;

/// How a node splits its subset.
#[derive(Clone, Debug, PartialEq)]
pub enum StrategyConfig {
    /// Balanced pivot-distance split (vantage-point style). `fanout` children per
    /// pivot, up to `fanout ^ num_pivots` children per node.
    Vp,
    /// Per-pivot 1-D k-means on pivot distances, picking the most discriminating
    /// pivot at every step. `fanout` clusters per pivot.
    Clustering,
    /// Generalized hyperplane: exactly two pivots, two children, nearest pivot wins.
    Gh,
    /// Nearest-of-k assignment with a cross-range matrix. One child per pivot;
    /// `fanout` is ignored.
    Gnat,
    /// Centroid/medoid clustering in pivot space with `fanout` clusters.
    Pct(PctConfig),
    /// Hyperplane projection onto a scored group of normal vectors.
    Cp(CpConfig),
}

impl StrategyConfig {
    /// Short name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vp => "vp",
            Self::Clustering => "clustering",
            Self::Gh => "gh",
            Self::Gnat => "gnat",
            Self::Pct(_) => "pct",
            Self::Cp(_) => "cp",
        }
    }

    /// Check pivot count and fanout against the variant's fixed shape.
    pub fn validate(&self, num_pivots: usize, fanout: usize) -> Result<(), BuildError> {
        let strategy = self.name();
        if num_pivots == 0 {
            return Err(BuildError::InvalidPivotCount {
                strategy,
                required: "at least 1",
                got: num_pivots,
            });
        }
        match self {
            Self::Gh => {
                if num_pivots != 2 {
                    return Err(BuildError::InvalidPivotCount {
                        strategy,
                        required: "exactly 2",
                        got: num_pivots,
                    });
                }
                if fanout != 2 {
                    return Err(BuildError::InvalidFanout { strategy, fanout });
                }
            }
            Self::Gnat => {}
            Self::Vp | Self::Clustering | Self::Pct(_) => {
                if fanout < 2 {
                    return Err(BuildError::InvalidFanout { strategy, fanout });
                }
            }
            Self::Cp(cp) => {
                if fanout < 2 {
                    return Err(BuildError::InvalidFanout { strategy, fanout });
                }
                cp.validate()?;
            }
        }
        Ok(())
    }
}

/// Clustering primitive used by [`StrategyConfig::Pct`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Clusterer {
    /// Lloyd iterations from a seeded random initialization.
    KMeans,
    /// Partitioning around medoids; centroids are actual points.
    Pam,
}

/// Parameters for the PCT strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct PctConfig {
    /// Clustering primitive.
    pub clusterer: Clusterer,
    /// Seed for the initial centroids.
    pub seed: u64,
    /// Iteration cap for k-means.
    pub max_iterations: usize,
    /// k-means stops once no centroid moves farther than this.
    pub tolerance: f64,
}

impl Default for PctConfig {
    fn default() -> Self {
        Self {
            clusterer: Clusterer::KMeans,
            seed: 0x5eed,
            max_iterations: 500,
            tolerance: 1e-4,
        }
    }
}

bitflags! {
    /// Sources of candidate normal vectors for the CP strategy.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct CandidateSources: u8 {
        /// Principal components of the pivot-space coordinates.
        const PCA = 1 << 0;
        /// Unit vectors along each pivot axis.
        const AXIS = 1 << 1;
        /// `e_i - e_{i+1}` style differences, the projection analogue of GH.
        const DIAGONAL = 1 << 2;
        /// A grid over the upper hemisphere. Only used with exactly 3 pivots.
        const SPHERE = 1 << 3;
    }
}

impl Default for CandidateSources {
    fn default() -> Self {
        Self::PCA | Self::AXIS | Self::DIAGONAL
    }
}

/// One-dimensional split applied to the projections of a normal-vector group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CpSplit {
    /// Median-balanced split, identical to [`StrategyConfig::Vp`].
    #[default]
    Balanced,
    /// Per-axis 1-D k-means, identical to [`StrategyConfig::Clustering`].
    Clustering,
}

/// Query workload used to score a normal-vector group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Workload {
    /// Every point of the subset being partitioned.
    #[default]
    Subset,
    /// The subset plus every dataset object whose pivot-space point lies within
    /// the workload radius of the subset's bounding box.
    Neighborhood,
}

/// Grid that samples directions on the upper hemisphere for 3 pivots.
///
/// Grid points `(x, y)` with `x, y = 0, step, .., (steps - 1) * step` map to
/// `(2x·sqrt(1 - ρ), 2y·sqrt(1 - ρ), 1 - 2ρ)` where `ρ = x² + y²`, keeping
/// points with `ρ <= 1` and a non-negative third component.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SphereSampling {
    /// Grid points per axis.
    pub steps: usize,
    /// Grid spacing.
    pub step: f64,
}

impl Default for SphereSampling {
    fn default() -> Self {
        Self {
            steps: 6,
            step: 0.2,
        }
    }
}

/// Parameters for the CP strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct CpConfig {
    /// Enabled candidate sources.
    pub sources: CandidateSources,
    /// Split applied to projections.
    pub split: CpSplit,
    /// Queries used to score groups.
    pub workload: Workload,
    /// Radius of every workload query.
    pub workload_radius: f64,
    /// Keep only the `n` most mutually orthogonal groups before scoring.
    pub max_groups: Option<usize>,
    /// Hemisphere sampling for 3 pivots.
    pub sphere: SphereSampling,
}

impl Default for CpConfig {
    fn default() -> Self {
        Self {
            sources: CandidateSources::default(),
            split: CpSplit::default(),
            workload: Workload::default(),
            workload_radius: 0.1,
            max_groups: Some(100),
            sphere: SphereSampling::default(),
        }
    }
}

impl CpConfig {
    fn validate(&self) -> Result<(), BuildError> {
        if self.sources.is_empty() {
            return Err(BuildError::NoCandidateSources);
        }
        if !(self.workload_radius > 0.0 && self.workload_radius.is_finite()) {
            return Err(BuildError::InvalidWorkloadRadius {
                radius: self.workload_radius,
            });
        }
        Ok(())
    }
}

/// Where each node's pivots come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PivotMode {
    /// Every node picks pivots from its own subset and removes them from it.
    #[default]
    Local,
    /// One pivot set, chosen at the root, is reused at every level.
    Global,
    /// A candidate set is chosen once from the whole dataset; every node picks
    /// its pivots from it.
    Mix {
        /// Candidate set size.
        candidates: usize,
    },
}

/// Everything [`build_index`](crate::build_index) needs besides the data.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildConfig {
    /// Pivots per node.
    pub num_pivots: usize,
    /// Strategy-specific fanout, see [`StrategyConfig`].
    pub fanout: usize,
    /// Subsets no larger than this become leaves.
    pub max_leaf_size: usize,
    /// Partition strategy.
    pub strategy: StrategyConfig,
    /// Hierarchical pivot selection mode.
    pub mode: PivotMode,
}

impl BuildConfig {
    /// Defaults: 2 pivots, fanout 2, leaves of up to 16 points, local pivots.
    pub fn new(strategy: StrategyConfig) -> Self {
        Self {
            num_pivots: 2,
            fanout: 2,
            max_leaf_size: 16,
            strategy,
            mode: PivotMode::Local,
        }
    }

    /// Set pivots per node.
    pub fn with_pivots(mut self, num_pivots: usize) -> Self {
        self.num_pivots = num_pivots;
        self
    }

    /// Set the fanout.
    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    /// Set the leaf capacity.
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    /// Set the pivot selection mode.
    pub fn with_mode(mut self, mode: PivotMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check every parameter against the dataset size.
    pub fn validate(&self, dataset_len: usize) -> Result<(), BuildError> {
        if dataset_len == 0 {
            return Err(BuildError::EmptyDataset);
        }
        if u32::try_from(dataset_len).is_err() {
            return Err(BuildError::TooManyObjects { len: dataset_len });
        }
        if self.max_leaf_size == 0 {
            return Err(BuildError::InvalidLeafSize);
        }
        self.strategy.validate(self.num_pivots, self.fanout)?;
        if let PivotMode::Mix { candidates } = self.mode
            && candidates < self.num_pivots
        {
            return Err(BuildError::NotEnoughCandidates {
                candidates,
                num_pivots: self.num_pivots,
            });
        }
        Ok(())
    }
}

/// Toggles for optional search shortcuts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Report whole children as matches when a pivot bound proves containment.
    pub containment_shortcut: bool,
    /// Tighten PCT exclusion with the bisector vote over query-box vertices.
    pub vertex_voting: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            containment_shortcut: true,
            vertex_voting: true,
        }
    }
}
