// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small dense linear algebra for principal components of pivot-space data.

use alloc::vec;
use alloc::vec::Vec;

use crate::math;
use crate::types::{Matrix, cmp_f64};

const JACOBI_SWEEPS: usize = 64;

/// Sample covariance of the rows of `data` (`cols × cols`).
pub(crate) fn covariance(data: &Matrix) -> Matrix {
    let n = data.rows();
    let d = data.cols();
    let mut mean = vec![0.0; d];
    for row in data.iter_rows() {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    if n > 0 {
        for m in &mut mean {
            *m /= n as f64;
        }
    }
    let mut cov = Matrix::filled(d, d, 0.0);
    for row in data.iter_rows() {
        for i in 0..d {
            let a = row[i] - mean[i];
            for j in i..d {
                let v = cov.get(i, j) + a * (row[j] - mean[j]);
                cov.set(i, j, v);
            }
        }
    }
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
    for i in 0..d {
        for j in i..d {
            let v = cov.get(i, j) / denom;
            cov.set(i, j, v);
            cov.set(j, i, v);
        }
    }
    cov
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` sorted by descending eigenvalue; row
/// `i` of the matrix is the unit eigenvector of eigenvalue `i`.
pub(crate) fn symmetric_eigen(a: &Matrix) -> (Vec<f64>, Matrix) {
    let d = a.rows();
    debug_assert_eq!(d, a.cols(), "matrix must be square");
    let mut m = a.clone();
    // Columns of `v` accumulate the rotations.
    let mut v = Matrix::filled(d, d, 0.0);
    for i in 0..d {
        v.set(i, i, 1.0);
    }
    for _ in 0..JACOBI_SWEEPS {
        let mut off = 0.0;
        for p in 0..d {
            for q in p + 1..d {
                off += m.get(p, q) * m.get(p, q);
            }
        }
        if off < 1e-22 {
            break;
        }
        for p in 0..d {
            for q in p + 1..d {
                let apq = m.get(p, q);
                if math::abs(apq) < 1e-300 {
                    continue;
                }
                let theta = (m.get(q, q) - m.get(p, p)) / (2.0 * apq);
                let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
                let t = sign / (math::abs(theta) + math::sqrt(theta * theta + 1.0));
                let c = 1.0 / math::sqrt(t * t + 1.0);
                let s = t * c;
                for k in 0..d {
                    let mkp = m.get(k, p);
                    let mkq = m.get(k, q);
                    m.set(k, p, c * mkp - s * mkq);
                    m.set(k, q, s * mkp + c * mkq);
                }
                for k in 0..d {
                    let mpk = m.get(p, k);
                    let mqk = m.get(q, k);
                    m.set(p, k, c * mpk - s * mqk);
                    m.set(q, k, s * mpk + c * mqk);
                }
                for k in 0..d {
                    let vkp = v.get(k, p);
                    let vkq = v.get(k, q);
                    v.set(k, p, c * vkp - s * vkq);
                    v.set(k, q, s * vkp + c * vkq);
                }
            }
        }
    }
    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&i, &j| cmp_f64(&m.get(j, j), &m.get(i, i)));
    let values = order.iter().map(|&i| m.get(i, i)).collect();
    let mut vectors = Matrix::with_cols(d);
    let mut col = vec![0.0; d];
    for &i in &order {
        for (k, c) in col.iter_mut().enumerate() {
            *c = v.get(k, i);
        }
        normalize(&mut col);
        vectors.push_row(&col);
    }
    (values, vectors)
}

/// Scale `v` to unit length; zero vectors are left untouched.
pub(crate) fn normalize(v: &mut [f64]) {
    let norm = math::sqrt(math::dot(v, v));
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}
