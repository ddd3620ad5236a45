// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handles and the dense row-major matrix shared by partitioning and search.

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// Identity of an object in the dataset an index was built from.
///
/// Pivots, leaf points and per-query memo entries are all keyed by this handle,
/// so the same object reached twice (as a pivot at two levels, or as a pivot and
/// as a data point) is recognized without comparing values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId(u32);

impl ObjectId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Dataset size is checked against u32::MAX before any id is minted."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    /// Position of the object in the dataset slice.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle to a node held by a [`NodeSource`](crate::tree::NodeSource).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "The builder checks the arena size against u32 before adding a node."
    )]
    pub(crate) const fn new(idx: usize) -> Self {
        Self(idx as u32)
    }

    /// Raw slot of the node, usable as a storage key.
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// Dense row-major matrix of `f64`.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// A `rows × cols` matrix filled with `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// An empty matrix with `cols` columns, ready for [`Matrix::push_row`].
    pub fn with_cols(cols: usize) -> Self {
        Self {
            rows: 0,
            cols,
            data: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutable access to row `i`.
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Entry at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Overwrite entry `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// Append a row; its length must equal [`Matrix::cols`].
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.cols, "row length must match column count");
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    /// Iterate over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// A new matrix made of the given rows of `self`, in order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut out = Self::with_cols(self.cols);
        for &r in rows {
            out.push_row(self.row(r));
        }
        out
    }
}

/// Total order on `f64` for sorting keys. Assumes no NaNs.
pub(crate) fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    debug_assert!(!a.is_nan() && !b.is_nan(), "distances must not be NaN");
    a.total_cmp(b)
}

/// Per-column `[min, max]` over the rows of `m` picked by `members`.
///
/// Returns `(lower, upper)`, each of length `m.cols()`. Empty `members`
/// yields `+inf`/`-inf` bounds.
pub(crate) fn column_extents(m: &Matrix, members: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let mut lower = vec![f64::INFINITY; m.cols()];
    let mut upper = vec![f64::NEG_INFINITY; m.cols()];
    for &r in members {
        for (j, &v) in m.row(r).iter().enumerate() {
            if v < lower[j] {
                lower[j] = v;
            }
            if v > upper[j] {
                upper[j] = v;
            }
        }
    }
    (lower, upper)
}
