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

//! The gauge: the unitary rotations and disentanglement coefficients that turn
//! Bloch bands into Wannier functions.
//!
//! At each k-point, the first `M_k` ("fixed") bands are always kept.  The
//! remaining `L_k = nwannier - M_k` degrees of freedom are drawn from the other
//! `nbands - M_k` bands through the orthonormal columns of `C_k`.  The square
//! matrix `U_k` then mixes the kept states together.

use crate::{c64, Error, Result};

use mlwf_linalg::{gram_schmidt, unitary_exp};
use ndarray::{s, Array1, Array2};
use rand::Rng;

/// How many functions to build, and how many bands are frozen at each k-point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Subspace {
    pub nwannier: usize,
    pub fixed_states: Vec<usize>,
}

impl Subspace {
    /// All `nwannier` states are fixed at every k-point, so there is no disentanglement.
    pub fn uniform(nwannier: usize, nkpts: usize) -> Subspace {
        Subspace { nwannier, fixed_states: vec![nwannier; nkpts] }
    }

    pub fn nkpts(&self) -> usize { self.fixed_states.len() }

    /// Extra degrees of freedom `L_k` at a k-point.
    pub fn extra(&self, k: usize) -> usize { self.nwannier - self.fixed_states[k] }

    pub fn check(&self, nbands: usize, nkpts: usize) -> Result<()> {
        if self.fixed_states.len() != nkpts {
            return Err(Error::ShapeMismatch(format!(
                "fixed states given for {} k-points, but there are {}", self.fixed_states.len(), nkpts,
            )));
        }
        if self.nwannier > nbands {
            return Err(Error::NotEnoughBands { nwannier: self.nwannier, nbands });
        }
        for (kpt, &fixed) in self.fixed_states.iter().enumerate() {
            if fixed > self.nwannier {
                return Err(Error::TooManyFixedStates { kpt, fixed, nwannier: self.nwannier });
            }
        }
        Ok(())
    }
}

/// `U_k` (`nwannier x nwannier`, unitary) and `C_k` (`(nbands - M_k) x L_k`,
/// orthonormal columns) at every k-point.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub rotations: Vec<Array2<c64>>,
    pub coefficients: Vec<Array2<c64>>,
}

/// A direction in the tangent space of a gauge, with the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeTangent {
    pub rotations: Vec<Array2<c64>>,
    pub coefficients: Vec<Array2<c64>>,
}

impl Gauge {
    /// Picks the lowest bands unchanged.
    pub fn bloch(subspace: &Subspace, nbands: usize) -> Gauge {
        let nw = subspace.nwannier;
        let mut rotations = vec![];
        let mut coefficients = vec![];
        for (k, &fixed) in subspace.fixed_states.iter().enumerate() {
            rotations.push(Array2::<c64>::eye(nw));
            coefficients.push(Array2::<c64>::eye(nbands - fixed).slice(s![.., ..subspace.extra(k)]).to_owned());
        }
        Gauge { rotations, coefficients }
    }

    /// Haar-random rotations and coefficients.
    pub fn random<R>(subspace: &Subspace, nbands: usize, rng: &mut R) -> Gauge
    where R: Rng + ?Sized,
    {
        let nw = subspace.nwannier;
        let mut rotations = vec![];
        let mut coefficients = vec![];
        for (k, &fixed) in subspace.fixed_states.iter().enumerate() {
            let c = mlwf_linalg::random_orthogonal_matrix(nbands - fixed, rng, false);
            coefficients.push(c.slice(s![.., ..subspace.extra(k)]).to_owned());
            rotations.push(mlwf_linalg::random_orthogonal_matrix(nw, rng, false));
        }
        Gauge { rotations, coefficients }
    }

    /// Check the matrix shapes against a subspace.
    pub fn check(&self, subspace: &Subspace, nbands: usize) -> Result<()> {
        let nkpts = subspace.nkpts();
        if self.rotations.len() != nkpts || self.coefficients.len() != nkpts {
            return Err(Error::ShapeMismatch(format!("gauge must have matrices for {} k-points", nkpts)));
        }
        for k in 0..nkpts {
            let nw = subspace.nwannier;
            let expected = (nbands - subspace.fixed_states[k], subspace.extra(k));
            if self.rotations[k].dim() != (nw, nw) {
                return Err(Error::ShapeMismatch(format!(
                    "rotation at k-point {} has shape {:?}, expected {:?}", k, self.rotations[k].dim(), (nw, nw),
                )));
            }
            if self.coefficients[k].dim() != expected {
                return Err(Error::ShapeMismatch(format!(
                    "coefficients at k-point {} have shape {:?}, expected {:?}", k, self.coefficients[k].dim(), expected,
                )));
            }
        }
        Ok(())
    }

    /// The `nbands x nwannier` matrix `V_k` whose columns give each function's
    /// band components at one k-point.
    pub fn vector(&self, k: usize, nbands: usize) -> Array2<c64> {
        let u = &self.rotations[k];
        let c = &self.coefficients[k];
        let nw = u.nrows();
        let fixed = nbands - c.nrows();

        let mut v = Array2::zeros((nbands, nw));
        v.slice_mut(s![..fixed, ..]).assign(&u.slice(s![..fixed, ..]));
        if c.ncols() > 0 {
            v.slice_mut(s![fixed.., ..]).assign(&c.dot(&u.slice(s![fixed.., ..])));
        }
        v
    }

    /// Move to `(U exp(-dU), GramSchmidt(C - dC))`.
    pub fn step(&mut self, dx: &GaugeTangent) {
        for (u, du) in self.rotations.iter_mut().zip(&dx.rotations) {
            *u = u.dot(&unitary_exp(du));
        }
        for (c, dc) in self.coefficients.iter_mut().zip(&dx.coefficients) {
            if c.ncols() > 0 {
                *c -= dc;
                gram_schmidt(c);
            }
        }
    }
}

impl GaugeTangent {
    pub fn zeros_like(gauge: &Gauge) -> GaugeTangent {
        GaugeTangent {
            rotations: gauge.rotations.iter().map(|u| Array2::zeros(u.dim())).collect(),
            coefficients: gauge.coefficients.iter().map(|c| Array2::zeros(c.dim())).collect(),
        }
    }

    /// All entries in one vector: at each k-point, `U` then `C`, in row-major order.
    pub fn flatten(&self) -> Array1<c64> {
        let mut out = vec![];
        for (u, c) in self.rotations.iter().zip(&self.coefficients) {
            out.extend(u.iter().cloned());
            out.extend(c.iter().cloned());
        }
        Array1::from(out)
    }

    /// Inverse of [`GaugeTangent::flatten`], with shapes taken from a gauge.
    ///
    /// The length of `flat` must match the gauge.
    pub fn unflatten(flat: &Array1<c64>, like: &Gauge) -> GaugeTangent {
        let expected: usize = like.rotations.iter().chain(&like.coefficients).map(|x| x.len()).sum();
        debug_assert_eq!(flat.len(), expected, "tangent length does not match the gauge");

        let mut iter = flat.iter().cloned();
        let mut take = |dim: (usize, usize)| {
            let data: Vec<c64> = iter.by_ref().take(dim.0 * dim.1).collect();
            Array2::from_shape_vec(dim, data).unwrap_or_else(|_| Array2::zeros(dim))
        };

        let mut rotations = vec![];
        let mut coefficients = vec![];
        for (u, c) in like.rotations.iter().zip(&like.coefficients) {
            rotations.push(take(u.dim()));
            coefficients.push(take(c.dim()));
        }
        GaugeTangent { rotations, coefficients }
    }

    pub fn scale(&mut self, factor: f64) {
        for x in self.rotations.iter_mut().chain(&mut self.coefficients) {
            x.mapv_inplace(|v| v * factor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn subspace() -> Subspace {
        Subspace { nwannier: 3, fixed_states: vec![1, 3, 2, 0] }
    }

    #[test]
    fn shapes() {
        let sub = subspace();
        let gauge = Gauge::bloch(&sub, 5);
        gauge.check(&sub, 5).unwrap();
        assert_eq!(gauge.coefficients[0].dim(), (4, 2));
        assert_eq!(gauge.coefficients[1].dim(), (2, 0));
        assert_eq!(gauge.coefficients[3].dim(), (5, 3));
        assert!(gauge.check(&sub, 6).is_err());
    }

    #[test]
    fn bloch_picks_lowest_bands() {
        let sub = subspace();
        let gauge = Gauge::bloch(&sub, 5);
        for k in 0..4 {
            let v = gauge.vector(k, 5);
            let mut expected = Array2::zeros((5, 3));
            for i in 0..3 {
                expected[[i, i]] = c64::from(1.0);
            }
            assert_close!(abs=1e-14, v, expected);
        }
    }

    #[test]
    fn vectors_stay_orthonormal() {
        let mut rng = StdRng::seed_from_u64(7);
        let sub = subspace();
        let mut gauge = Gauge::random(&sub, 5, &mut rng);
        gauge.check(&sub, 5).unwrap();

        let mut dx = GaugeTangent::zeros_like(&gauge);
        for x in dx.rotations.iter_mut().chain(&mut dx.coefficients) {
            x.mapv_inplace(|_| c64::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3)));
        }
        for u in &mut dx.rotations {
            *u = &*u - &mlwf_linalg::dagger(u);
        }
        gauge.step(&dx);

        for k in 0..4 {
            assert!(mlwf_linalg::orthonormality_error(&gauge.rotations[k]) < 1e-12);
            assert!(mlwf_linalg::orthonormality_error(&gauge.vector(k, 5)) < 1e-12);
        }
    }

    #[test]
    fn flatten_layout() {
        let mut rng = StdRng::seed_from_u64(8);
        let gauge = Gauge::random(&subspace(), 5, &mut rng);
        let tangent = GaugeTangent { rotations: gauge.rotations.clone(), coefficients: gauge.coefficients.clone() };
        let flat = tangent.flatten();
        assert_eq!(flat.len(), 4 * 9 + 8 + 0 + 3 + 15);
        assert_eq!(flat[9], gauge.coefficients[0][[0, 0]]);
        assert_eq!(GaugeTangent::unflatten(&flat, &gauge), tangent);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "does not match the gauge")]
    fn unflatten_rejects_wrong_length() {
        let mut rng = StdRng::seed_from_u64(9);
        let gauge = Gauge::random(&subspace(), 5, &mut rng);
        let flat = GaugeTangent { rotations: gauge.rotations.clone(), coefficients: gauge.coefficients.clone() }.flatten();
        let short = flat.slice(s![..flat.len() - 1]).to_owned();
        GaugeTangent::unflatten(&short, &gauge);
    }

    #[test]
    fn subspace_validation() {
        assert!(Subspace::uniform(3, 2).check(3, 2).is_ok());
        match Subspace::uniform(4, 2).check(3, 2) {
            Err(Error::NotEnoughBands { nwannier: 4, nbands: 3 }) => {},
            r => panic!("unexpected: {:?}", r),
        }
        let sub = Subspace { nwannier: 2, fixed_states: vec![1, 3] };
        match sub.check(4, 2) {
            Err(Error::TooManyFixedStates { kpt: 1, .. }) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
