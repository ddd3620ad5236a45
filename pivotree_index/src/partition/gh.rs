// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generalized hyperplane split: two pivots, each point goes to the nearer one.

use alloc::vec::Vec;

use crate::node::{GhBounds, SearchAction};
use crate::types::Matrix;

/// Points strictly closer to pivot 0 form child `0`, the rest child `1`.
/// An empty side is dropped.
pub(crate) fn split(coords: &Matrix) -> (Vec<Vec<usize>>, GhBounds) {
    debug_assert_eq!(coords.cols(), 2, "GH partitions on exactly two pivots");
    let mut near = [Vec::new(), Vec::new()];
    for (r, d) in coords.iter_rows().enumerate() {
        let side = usize::from(d[0] >= d[1]);
        near[side].push(r);
    }
    let mut groups = Vec::with_capacity(2);
    let mut sides = Vec::with_capacity(2);
    for (side, g) in (0_u8..).zip(near) {
        if !g.is_empty() {
            groups.push(g);
            sides.push(side);
        }
    }
    (groups, GhBounds { sides })
}

impl GhBounds {
    /// A side is excluded when the query is more than `2r` closer to the other
    /// pivot: any match `x` would then be closer to the other pivot too.
    pub(crate) fn classify(&self, d: &[f64], r: f64, out: &mut Vec<SearchAction>) {
        for &side in &self.sides {
            let (own, other) = if side == 0 { (d[0], d[1]) } else { (d[1], d[0]) };
            out.push(if own - other > 2.0 * r {
                SearchAction::Exclude
            } else {
                SearchAction::Recurse
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn ties_go_to_the_second_pivot() {
        let mut coords = Matrix::with_cols(2);
        for &(a, b) in &[(1.0, 3.0), (2.0, 2.0), (4.0, 1.0)] {
            coords.push_row(&[a, b]);
        }
        let (groups, bounds) = split(&coords);
        assert_eq!(groups, vec![vec![0], vec![1, 2]]);
        assert_eq!(bounds.sides, vec![0, 1]);
    }

    #[test]
    fn one_sided_split_keeps_side_label() {
        let mut coords = Matrix::with_cols(2);
        coords.push_row(&[5.0, 1.0]);
        let (groups, bounds) = split(&coords);
        assert_eq!(groups.len(), 1);
        assert_eq!(bounds.sides, vec![1]);
    }

    #[test]
    fn far_side_is_excluded() {
        let b = GhBounds { sides: vec![0, 1] };
        let mut out = Vec::new();
        // Query sits next to pivot 0 and far from pivot 1.
        b.classify(&[0.5, 6.0], 1.0, &mut out);
        assert_eq!(out, vec![SearchAction::Recurse, SearchAction::Exclude]);
        out.clear();
        b.classify(&[2.0, 3.0], 1.0, &mut out);
        assert_eq!(out, vec![SearchAction::Recurse, SearchAction::Recurse]);
    }
}
