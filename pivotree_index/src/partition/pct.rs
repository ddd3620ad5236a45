// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clustering in pivot space.
//!
//! Points are mapped to their pivot distances and clustered there with plain
//! Euclidean k-means or k-medoids; the metric the tree was built with plays no
//! part. A point exactly equidistant to several centroids is placed in all of
//! them, so children may overlap.

use alloc::vec::Vec;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::cluster;
use crate::config::{Clusterer, PctConfig, SearchConfig};
use crate::math;
use crate::node::{PctBounds, SearchAction};
use crate::types::{Matrix, column_extents};

/// Vertex voting enumerates `2^k` corners; above this many pivots it is skipped.
const MAX_VOTING_DIMS: usize = 16;
/// Relative slack on the float comparisons that exclude a child.
const EXCLUSION_SLACK: f64 = 1e-9;

pub(crate) fn split(
    coords: &Matrix,
    fanout: usize,
    cfg: &PctConfig,
) -> (Vec<Vec<usize>>, PctBounds) {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let centers = match cfg.clusterer {
        Clusterer::KMeans => {
            cluster::kmeans(coords, fanout, cfg.max_iterations, cfg.tolerance, &mut rng)
        }
        Clusterer::Pam => coords.select_rows(&cluster::pam(coords, fanout, &mut rng)),
    };

    let centers = distinct_rows(&centers);
    let members = assign(coords, &centers);

    let mut groups = Vec::new();
    let mut centroids = Matrix::with_cols(coords.cols());
    let mut radius = Vec::new();
    let mut lower = Matrix::with_cols(coords.cols());
    let mut upper = Matrix::with_cols(coords.cols());
    for (c, g) in members.into_iter().enumerate() {
        if g.is_empty() {
            continue;
        }
        let center = centers.row(c);
        let reach = g
            .iter()
            .map(|&r| math::dist(center, coords.row(r)))
            .fold(0.0, f64::max);
        let (lo, hi) = column_extents(coords, &g);
        centroids.push_row(center);
        radius.push(reach);
        lower.push_row(&lo);
        upper.push_row(&hi);
        groups.push(g);
    }
    (
        groups,
        PctBounds {
            centroids,
            radius,
            lower,
            upper,
        },
    )
}

/// `m` without the rows that repeat an earlier row.
fn distinct_rows(m: &Matrix) -> Matrix {
    let mut out = Matrix::with_cols(m.cols());
    for row in m.iter_rows() {
        if !out.iter_rows().any(|seen| seen == row) {
            out.push_row(row);
        }
    }
    out
}

/// Rows nearest to each center. Exact ties join every tied center.
fn assign(coords: &Matrix, centers: &Matrix) -> Vec<Vec<usize>> {
    let mut members: Vec<Vec<usize>> = (0..centers.rows()).map(|_| Vec::new()).collect();
    let mut dists = Vec::with_capacity(centers.rows());
    for (r, point) in coords.iter_rows().enumerate() {
        dists.clear();
        dists.extend(centers.iter_rows().map(|c| math::dist(c, point)));
        let best = dists.iter().copied().fold(f64::INFINITY, f64::min);
        for (c, &d) in dists.iter().enumerate() {
            if d == best {
                members[c].push(r);
            }
        }
    }
    members
}

impl PctBounds {
    /// Box and ball tests per child, then an optional bisector vote.
    ///
    /// In pivot space every match lies in the cube `q' ± r`, and within
    /// `sqrt(k) * r` of `q'`. A child whose bounding box or ball misses that region
    /// is excluded. A child whose box sits inside the cube, or whose ball sits
    /// inside the radius-`r` ball, is scanned linearly. With
    /// [`SearchConfig::vertex_voting`], a child is also excluded when some other
    /// centroid is strictly nearer than its own at every cube vertex.
    pub(crate) fn classify(
        &self,
        d: &[f64],
        r: f64,
        config: &SearchConfig,
        out: &mut Vec<SearchAction>,
    ) {
        let k = d.len();
        let spread = math::sqrt(k as f64) * r;
        for c in 0..self.centroids.rows() {
            let lower = self.lower.row(c);
            let upper = self.upper.row(c);
            let disjoint = (0..k).any(|j| d[j] + r < lower[j] || d[j] - r > upper[j]);
            let to_center = math::dist(d, self.centroids.row(c));
            // Both sides of the ball test are rounded sums of square roots.
            let reach = (self.radius[c] + spread) * (1.0 + EXCLUSION_SLACK);
            let action = if disjoint || to_center > reach {
                SearchAction::Exclude
            } else if (0..k).all(|j| d[j] - r <= lower[j] && upper[j] <= d[j] + r)
                || to_center + self.radius[c] <= r
            {
                SearchAction::NeedsLinearScan
            } else {
                SearchAction::Recurse
            };
            out.push(action);
        }

        if !config.vertex_voting || k > MAX_VOTING_DIMS || self.centroids.rows() < 2 {
            return;
        }
        let mut vertex = Vec::with_capacity(k);
        for c in 0..out.len() {
            if out[c] == SearchAction::Exclude {
                continue;
            }
            let own = self.centroids.row(c);
            let beaten = (0..self.centroids.rows()).any(|l| {
                l != c && beaten_everywhere(own, self.centroids.row(l), d, r, &mut vertex)
            });
            if beaten {
                out[c] = SearchAction::Exclude;
            }
        }
    }
}

/// Whether `other` is strictly nearer than `own` at every vertex of `q' ± r`.
///
/// The squared-distance difference is affine in the vertex, so this then holds
/// over the whole cube.
fn beaten_everywhere(
    own: &[f64],
    other: &[f64],
    q: &[f64],
    r: f64,
    vertex: &mut Vec<f64>,
) -> bool {
    (0_u32..1 << q.len()).all(|mask| {
        vertex.clear();
        vertex.extend(
            q.iter()
                .enumerate()
                .map(|(j, &x)| if mask & (1 << j) == 0 { x - r } else { x + r }),
        );
        let to_own = math::dist_sq(vertex, own);
        let to_other = math::dist_sq(vertex, other);
        to_own - to_other > EXCLUSION_SLACK * (1.0 + to_own)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn blobs() -> Matrix {
        let mut m = Matrix::with_cols(2);
        for &(x, y) in &[
            (0.0, 0.0),
            (0.5, 0.0),
            (0.0, 0.5),
            (10.0, 10.0),
            (10.5, 10.0),
            (10.0, 10.5),
        ] {
            m.push_row(&[x, y]);
        }
        m
    }

    fn sorted(mut groups: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        groups.sort();
        groups
    }

    #[test]
    fn both_clusterers_find_the_blobs() {
        for clusterer in [Clusterer::KMeans, Clusterer::Pam] {
            let cfg = PctConfig {
                clusterer,
                ..PctConfig::default()
            };
            let (groups, bounds) = split(&blobs(), 2, &cfg);
            assert_eq!(sorted(groups), vec![vec![0, 1, 2], vec![3, 4, 5]]);
            assert_eq!(bounds.centroids.rows(), 2);
            assert!(bounds.radius.iter().all(|&r| r < 1.0));
        }
    }

    #[test]
    fn every_point_is_its_own_centroid_when_fanout_exceeds_size() {
        let (groups, bounds) = split(&blobs(), 10, &PctConfig::default());
        assert_eq!(groups.len(), 6);
        assert!(bounds.radius.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn coincident_centers_collapse_to_one_cluster() {
        let mut points = Matrix::with_cols(2);
        for _ in 0..5 {
            points.push_row(&[3.0, 3.0]);
        }
        for clusterer in [Clusterer::KMeans, Clusterer::Pam] {
            let cfg = PctConfig {
                clusterer,
                ..PctConfig::default()
            };
            let (groups, bounds) = split(&points, 3, &cfg);
            assert_eq!(groups, vec![vec![0, 1, 2, 3, 4]], "{clusterer:?}");
            assert_eq!(bounds.radius, vec![0.0]);
        }
    }

    #[test]
    fn equidistant_points_are_duplicated() {
        let mut points = Matrix::with_cols(1);
        let mut centers = Matrix::with_cols(1);
        for v in [0.0, 1.0, 2.0] {
            points.push_row(&[v]);
        }
        centers.push_row(&[0.0]);
        centers.push_row(&[2.0]);
        assert_eq!(assign(&points, &centers), vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn box_and_ball_actions() {
        let (_, bounds) = split(&blobs(), 2, &PctConfig::default());
        let no_vote = SearchConfig {
            vertex_voting: false,
            ..SearchConfig::default()
        };
        let mut out = Vec::new();
        bounds.classify(&[0.2, 0.2], 1.0, &no_vote, &mut out);
        let near = nearest_child(&bounds, &[0.0, 0.0]);
        assert_eq!(out[near], SearchAction::NeedsLinearScan);
        assert_eq!(out[1 - near], SearchAction::Exclude);
        out.clear();
        bounds.classify(&[0.6, 0.6], 0.3, &no_vote, &mut out);
        assert_eq!(out[near], SearchAction::Recurse);
    }

    #[test]
    fn vertex_vote_excludes_the_far_cluster() {
        // Boxes overlap the query cube, but every cube vertex is nearer to centroid 0.
        let mut centroids = Matrix::with_cols(2);
        centroids.push_row(&[0.0, 0.0]);
        centroids.push_row(&[4.0, 0.0]);
        let mut lower = Matrix::with_cols(2);
        let mut upper = Matrix::with_cols(2);
        lower.push_row(&[-2.0, -2.0]);
        upper.push_row(&[2.0, 2.0]);
        lower.push_row(&[1.0, -2.0]);
        upper.push_row(&[6.0, 2.0]);
        let bounds = PctBounds {
            centroids,
            radius: vec![3.0, 3.0],
            lower,
            upper,
        };
        let mut out = Vec::new();
        let no_vote = SearchConfig {
            vertex_voting: false,
            ..SearchConfig::default()
        };
        bounds.classify(&[0.5, 0.0], 1.0, &no_vote, &mut out);
        assert_eq!(out, vec![SearchAction::Recurse, SearchAction::Recurse]);
        out.clear();
        bounds.classify(&[0.5, 0.0], 1.0, &SearchConfig::default(), &mut out);
        assert_eq!(out, vec![SearchAction::Recurse, SearchAction::Exclude]);
    }

    fn nearest_child(bounds: &PctBounds, point: &[f64]) -> usize {
        cluster::nearest(&bounds.centroids, point)
    }
}
