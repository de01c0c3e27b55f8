/* ************************************************************************ **
** This file is part of mlwf, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of mlwf is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

//! Dense complex linear algebra.
//!
//! Everything here speaks `ndarray`.  Where a factorization is needed, the data is
//! converted to `nalgebra` internally; no `nalgebra` types appear in the public API.

#[cfg(test)]
#[macro_use]
extern crate mlwf_assert_close;

use ndarray::{Array1, Array2, ArrayBase, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Data, Ix2};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

#[allow(non_camel_case_types)]
pub type c64 = Complex64;

/// Eigenvalues below this (relative to the largest) are treated as zero.
const DEGENERACY_TOL: f64 = 1e-13;

#[derive(Debug, thiserror::Error)]
#[error("matrix was perfectly degenerate")]
pub struct DegenerateMatrixError;

/// Conjugate transpose.
pub fn dagger<S>(a: &ArrayBase<S, Ix2>) -> Array2<c64>
where S: Data<Elem = c64>,
{ a.t().mapv(|x| x.conj()) }

/// Scale a vector to unit norm.
pub fn normalize_vector(mut v: ArrayViewMut1<'_, c64>) {
    let norm = v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt();
    v.mapv_inplace(|x| x / norm);
}

/// Scale each column of a matrix to unit norm.
pub fn normalize(mut a: ArrayViewMut2<'_, c64>) {
    for col in a.columns_mut() {
        normalize_vector(col);
    }
}

/// Orthonormalize the columns of `a` in place, from left to right.
///
/// `a` may be tall.  A column that is linearly dependent on the columns before it
/// will produce NaNs; callers are expected not to supply such input.
pub fn gram_schmidt(a: &mut Array2<c64>) {
    for i in 0..a.ncols() {
        let (done, mut rest) = a.view_mut().split_at(Axis(1), i);
        let mut col = rest.column_mut(0);
        for prev in done.columns() {
            let proj: c64 = prev.iter().zip(col.iter()).map(|(p, c)| p.conj() * c).sum();
            col.zip_mut_with(&prev, |c, &p| *c -= proj * p);
        }
        normalize_vector(col);
    }
}

/// Symmetric orthonormalization, `a (a† a)^{-1/2}`.
///
/// Of all matrices with orthonormal columns, this is the one closest to `a`
/// in the Frobenius norm.
pub fn lowdin(a: &Array2<c64>) -> Result<Array2<c64>, DegenerateMatrixError> {
    let overlap = dagger(a).dot(a);
    Ok(a.dot(&inverse_sqrt(&overlap)?))
}

/// `s^{-1/2}` for a Hermitian positive-definite matrix.
pub fn inverse_sqrt(s: &Array2<c64>) -> Result<Array2<c64>, DegenerateMatrixError> {
    let (values, vectors) = eigh(s);
    let max = values.iter().cloned().fold(0.0, f64::max);
    if values.iter().any(|&x| x <= DEGENERACY_TOL * f64::max(max, 1.0)) {
        return Err(DegenerateMatrixError);
    }
    Ok(scale_columns_and_recombine(&vectors, values.mapv(|x| c64::from(x.powf(-0.5)))))
}

/// Eigendecomposition of a Hermitian matrix, with eigenvalues in ascending order.
///
/// Only the Hermitian part of the input is considered.
pub fn eigh(h: &Array2<c64>) -> (Array1<f64>, Array2<c64>) {
    assert!(h.is_square());
    let n = h.nrows();
    if n == 0 {
        return (Array1::zeros(0), Array2::zeros((0, 0)));
    }

    let mat = nalgebra::DMatrix::from_fn(n, n, |i, j| 0.5 * (h[[i, j]] + h[[j, i]].conj()));
    let eig = nalgebra::SymmetricEigen::new(mat);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[a].partial_cmp(&eig.eigenvalues[b]).unwrap_or(std::cmp::Ordering::Equal)
    });
    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, order[j])]);
    (values, vectors)
}

/// Computes `exp(-dx)` for an anti-Hermitian `dx`.
///
/// The result is unitary to machine precision regardless of the size of `dx`.
pub fn unitary_exp(dx: &Array2<c64>) -> Array2<c64> {
    // dx = -iH for Hermitian H, so exp(-dx) = exp(iH).
    let h = dx.mapv(|x| c64::i() * x);
    let (values, vectors) = eigh(&h);
    scale_columns_and_recombine(&vectors, values.mapv(|x| c64::new(0.0, x).exp()))
}

// Computes `z diag(d) z†`.
fn scale_columns_and_recombine(z: &Array2<c64>, d: Array1<c64>) -> Array2<c64> {
    let scaled = z * &d.insert_axis(Axis(0));
    scaled.dot(&dagger(z))
}

/// A random unitary matrix (or a real orthogonal one, stored as complex).
///
/// Gram-Schmidt on a matrix of standard normal deviates, which samples the Haar measure.
pub fn random_orthogonal_matrix<R>(dim: usize, rng: &mut R, real: bool) -> Array2<c64>
where R: Rng + ?Sized,
{
    let mut mat = Array2::from_shape_fn((dim, dim), |_| {
        let re: f64 = StandardNormal.sample(&mut *rng);
        let im: f64 = match real {
            true => 0.0,
            false => StandardNormal.sample(&mut *rng),
        };
        c64::new(re, im)
    });
    gram_schmidt(&mut mat);
    mat
}

/// Maximum elementwise deviation of `a† a` from the identity.
pub fn orthonormality_error(a: &Array2<c64>) -> f64 {
    let mut overlap = dagger(a).dot(a);
    for i in 0..overlap.nrows() {
        overlap[[i, i]] -= 1.0;
    }
    overlap.iter().map(|x| x.norm()).fold(0.0, f64::max)
}

/// Column selection of a QR factorization with column pivoting.
///
/// Returns the indices of the first `count` pivot columns, in pivot order.
/// At each step, the column with the largest norm after projecting out all
/// previously chosen columns is selected.
pub fn pivoted_columns(a: ArrayView2<'_, c64>, count: usize) -> Result<Vec<usize>, DegenerateMatrixError> {
    if count > a.ncols() {
        return Err(DegenerateMatrixError);
    }
    let mut residual = a.to_owned();
    let mut norms: Vec<f64> = residual.columns().into_iter()
        .map(|col| col.iter().map(|x| x.norm_sqr()).sum())
        .collect();
    let scale = norms.iter().cloned().fold(0.0, f64::max);

    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count {
        let (pivot, &norm) = norms.iter().enumerate()
            .filter(|&(j, _)| !chosen.contains(&j))
            .fold(None, |best: Option<(usize, &f64)>, (j, x)| match best {
                Some((_, b)) if b >= x => best,
                _ => Some((j, x)),
            })
            .ok_or(DegenerateMatrixError)?;
        if norm <= DEGENERACY_TOL * scale {
            return Err(DegenerateMatrixError);
        }
        chosen.push(pivot);

        let q = residual.column(pivot).mapv(|x| x / norm.sqrt());
        let coeffs = q.mapv(|x| x.conj()).dot(&residual);
        for (mut col, &coeff) in residual.columns_mut().into_iter().zip(&coeffs) {
            col.zip_mut_with(&q, |r, &q| *r -= coeff * q);
        }
        for (n, col) in norms.iter_mut().zip(residual.columns()) {
            *n = col.iter().map(|x| x.norm_sqr()).sum();
        }
    }
    Ok(chosen)
}
