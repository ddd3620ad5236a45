// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-of-k assignment with a cross-range matrix.
//!
//! Every point joins the group of its nearest pivot (lowest index on ties).
//! For each group the split records the range of distances from its members to
//! every pivot, and the group's radius around its own pivot. One group is formed
//! per pivot; empty groups are dropped and `owners` remembers which pivot each
//! surviving child belongs to.

use alloc::vec::Vec;

use crate::config::SearchConfig;
use crate::node::{GnatBounds, SearchAction};
use crate::types::{Matrix, column_extents};

pub(crate) fn split(coords: &Matrix) -> (Vec<Vec<usize>>, GnatBounds) {
    let k = coords.cols();
    let mut by_pivot: Vec<Vec<usize>> = (0..k).map(|_| Vec::new()).collect();
    for (r, d) in coords.iter_rows().enumerate() {
        let mut best = 0;
        for j in 1..k {
            if d[j] < d[best] {
                best = j;
            }
        }
        by_pivot[best].push(r);
    }

    let mut groups = Vec::new();
    let mut owners = Vec::new();
    let mut lower = Matrix::with_cols(k);
    let mut upper = Matrix::with_cols(k);
    let mut radius = Vec::new();
    for (owner, g) in by_pivot.into_iter().enumerate() {
        if g.is_empty() {
            continue;
        }
        let (lo, hi) = column_extents(coords, &g);
        radius.push(hi[owner]);
        lower.push_row(&lo);
        upper.push_row(&hi);
        owners.push(owner);
        groups.push(g);
    }
    (
        groups,
        GnatBounds {
            owners,
            lower,
            upper,
            radius,
        },
    )
}

impl GnatBounds {
    /// Exclusion runs first: the group's ball around its own pivot, then every
    /// pivot's recorded range against `[d - r, d + r]`. A surviving group whose
    /// ball lies inside the query ball is included whole.
    pub(crate) fn classify(
        &self,
        d: &[f64],
        r: f64,
        config: &SearchConfig,
        out: &mut Vec<SearchAction>,
    ) {
        for (c, &owner) in self.owners.iter().enumerate() {
            let radius = self.radius[c];
            let lower = self.lower.row(c);
            let upper = self.upper.row(c);
            let outside_ball = d[owner] > radius + r;
            let outside_range = (0..d.len()).any(|j| d[j] + r < lower[j] || d[j] - r > upper[j]);
            let action = if outside_ball || outside_range {
                SearchAction::Exclude
            } else if config.containment_shortcut && d[owner] + radius <= r {
                SearchAction::IncludeAll
            } else {
                SearchAction::Recurse
            };
            out.push(action);
        }
    }
}
