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

//! Integrals over a periodic real-space grid.
//!
//! Grid point `(i, j, l)` of an array with shape `(n0, n1, n2)` sits at
//! fractional coordinates `(i/n0, j/n1, l/n2)`.  Integrals are plain sums.

use crate::c64;
use crate::lattice::{self, V3};

use std::f64::consts::PI;

use ndarray::{Array2, Array3, ArrayView1};

/// `e^{sign·2πi b·s}` at every grid point.
pub fn phase_grid(shape: &[usize], b: &V3, sign: f64) -> Array3<c64> {
    Array3::from_shape_fn((shape[0], shape[1], shape[2]), |idx| {
        let s = lattice::grid_point(idx, shape);
        c64::from_polar(1.0, sign * 2.0 * PI * lattice::dot(b, &s))
    })
}

/// `Σ_s conj(a(s)) b(s)`
pub fn inner(a: &Array3<c64>, b: &Array3<c64>) -> c64 {
    a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum()
}

/// `Z_nm = Σ_s conj(bra_n(s)) ket_m(s) e^{-2πi b·s}`
///
/// With `b` the difference between the k-points of `ket` and `bra`, the phase
/// cancels the Bloch factors, so this is the overlap of the periodic parts.
pub fn localization_matrix(bra: &[Array3<c64>], ket: &[Array3<c64>], b: &V3) -> Array2<c64> {
    let mut out = Array2::zeros((bra.len(), ket.len()));
    let shape = match ket.first() {
        Some(psi) => psi.shape().to_vec(),
        None => return out,
    };

    let phase = phase_grid(&shape, b, -1.0);
    for (m, ket) in ket.iter().enumerate() {
        let shifted = ket * &phase;
        for (n, bra) in bra.iter().enumerate() {
            out[[n, m]] = inner(bra, &shifted);
        }
    }
    out
}

/// `S_nm = Σ_s conj(bra_n(s)) ket_m(s)`
pub fn overlap_matrix(bra: &[Array3<c64>], ket: &[Array3<c64>]) -> Array2<c64> {
    Array2::from_shape_fn((bra.len(), ket.len()), |(n, m)| inner(&bra[n], &ket[m]))
}

/// `Σ_n c_n states_n`
pub fn combine(coeffs: ArrayView1<'_, c64>, states: &[Array3<c64>]) -> Option<Array3<c64>> {
    let mut iter = coeffs.iter().zip(states);
    let (&c, first) = iter.next()?;
    let mut out = first.mapv(|x| c * x);
    for (&c, state) in iter {
        out.zip_mut_with(state, |o, &x| *o += c * x);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_wave(shape: [usize; 3], g: [i32; 3]) -> Array3<c64> {
        let g = [g[0] as f64, g[1] as f64, g[2] as f64];
        let norm = ((shape[0] * shape[1] * shape[2]) as f64).sqrt();
        phase_grid(&shape, &g, 1.0).mapv(|x| x / norm)
    }

    #[test]
    fn plane_waves_are_orthonormal() {
        let shape = [4, 3, 5];
        let waves = vec![plane_wave(shape, [0, 0, 0]), plane_wave(shape, [1, 0, 0]), plane_wave(shape, [0, 2, -1])];
        let s = overlap_matrix(&waves, &waves);
        assert_close!(abs=1e-12, s, Array2::<c64>::eye(3));
    }

    #[test]
    fn localization_matrix_shifts_momentum() {
        // e^{-2πi b·s} maps the wave with momentum g+b onto momentum g
        let shape = [4, 4, 4];
        let bra = vec![plane_wave(shape, [0, 0, 0])];
        let ket = vec![plane_wave(shape, [1, 0, 0])];
        let z = localization_matrix(&bra, &ket, &[1.0, 0.0, 0.0]);
        assert_close!(abs=1e-12, z[[0, 0]], c64::from(1.0));
        let z = localization_matrix(&bra, &ket, &[0.0, 0.0, 0.0]);
        assert_close!(abs=1e-12, z[[0, 0]], c64::from(0.0));
    }

    #[test]
    fn combine_is_linear() {
        let shape = [2, 3, 2];
        let waves = vec![plane_wave(shape, [1, 0, 0]), plane_wave(shape, [0, 1, 0])];
        let coeffs = ndarray::arr1(&[c64::new(0.5, 0.0), c64::new(0.0, -2.0)]);
        let out = combine(coeffs.view(), &waves).unwrap();
        let expected = &waves[0] * c64::new(0.5, 0.0) + &waves[1] * c64::new(0.0, -2.0);
        assert_close!(abs=1e-12, out, expected);
    }
}
