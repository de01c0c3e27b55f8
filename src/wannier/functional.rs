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

//! The localization functional and its gradient.
//!
//! For each finite-difference direction `d`, the rotated overlaps
//! `Z_d = (1/Nk) Σ_k V_k† Z_dk V_k1` are averaged over the mesh, and each
//! function `w` gets the localization measure `a_w = Σ_d w_d |(Z_d)_ww|²`.
//! The functional `Ω` is maximized.

use crate::c64;
use crate::gauge::{Gauge, GaugeTangent, Subspace};
use crate::problem::Problem;

use mlwf_linalg::dagger;
use ndarray::{s, Array1, Array2, Axis};

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Functional {
    /// `Ω = Σ_w a_w`
    Std,
    /// `Ω = Σ_w a_w - nwannier · var(a)`, which also favors equal spreads.
    Var,
}

impl Default for Functional {
    fn default() -> Self { Functional::Std }
}

/// Quantities derived from a gauge that the functional and its gradient depend on.
#[derive(Debug, Clone)]
pub struct Rotated {
    /// `V_k`, by k-point.
    pub vectors: Vec<Array2<c64>>,
    /// `V_k† Z_dk V_k1`, indexed `[d][k]`.
    pub overlaps: Vec<Vec<Array2<c64>>>,
    /// `Z_d`, the mesh average of `overlaps[d]`.
    pub averages: Vec<Array2<c64>>,
}

impl Rotated {
    pub fn new(problem: &Problem, gauge: &Gauge) -> Rotated {
        let mesh = problem.mesh();
        let nkpts = problem.nkpts();
        let vectors: Vec<_> = (0..nkpts).map(|k| gauge.vector(k, problem.nbands())).collect();

        let mut overlaps = vec![];
        let mut averages = vec![];
        for d in 0..problem.ndirections() {
            let by_kpt: Vec<Array2<c64>> = (0..nkpts)
                .map(|k| {
                    let k1 = mesh.neighbors[d][k];
                    dagger(&vectors[k]).dot(&problem.overlap(d, k).dot(&vectors[k1]))
                })
                .collect();

            let nw = gauge.rotations.first().map_or(0, |u| u.nrows());
            let mut avg = Array2::zeros((nw, nw));
            for z in &by_kpt {
                avg += z;
            }
            avg.mapv_inplace(|x| x / nkpts as f64);

            overlaps.push(by_kpt);
            averages.push(avg);
        }
        Rotated { vectors, overlaps, averages }
    }

    /// The diagonal of `Z_d`.
    pub fn diagonal(&self, d: usize) -> Array1<c64> { self.averages[d].diag().to_owned() }

    pub fn nwannier(&self) -> usize { self.averages.first().map_or(0, |z| z.nrows()) }
}

/// `a_w = Σ_d w_d |(Z_d)_ww|²` with the normalized weights.
pub fn localization_terms(problem: &Problem, rotated: &Rotated) -> Array1<f64> {
    let mut out = Array1::zeros(rotated.nwannier());
    for (d, &weight) in problem.mesh().weights.iter().enumerate() {
        out.zip_mut_with(&rotated.diagonal(d), |a, z| *a += weight * z.norm_sqr());
    }
    out
}

impl Functional {
    pub fn value(self, problem: &Problem, rotated: &Rotated) -> f64 {
        let terms = localization_terms(problem, rotated);
        let sum = terms.sum();
        match self {
            Functional::Std => sum,
            Functional::Var => {
                let n = terms.len() as f64;
                let mean = sum / n;
                let variance = terms.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
                sum - n * variance
            },
        }
    }

    /// `∂Ω/∂a_w`
    fn term_coefficients(self, terms: &Array1<f64>) -> Array1<f64> {
        match self {
            Functional::Std => Array1::ones(terms.len()),
            Functional::Var => {
                let mean = terms.sum() / terms.len() as f64;
                terms.mapv(|a| 1.0 - 2.0 * (a - mean))
            },
        }
    }

    /// The gradient of `Ω`.
    ///
    /// For the rotations, this is the anti-Hermitian `G_U` such that
    /// `U ← U (1 + εX)` changes `Ω` by `ε Re Σ conj(G_U) X`.  For the coefficients,
    /// it is the projection of `∂Ω/∂C*` onto the tangent space of the orthonormality
    /// constraint.
    pub fn gradient(self, problem: &Problem, subspace: &Subspace, gauge: &Gauge, rotated: &Rotated) -> GaugeTangent {
        let mesh = problem.mesh();
        let nkpts = problem.nkpts();
        let nw = subspace.nwannier;
        let terms = localization_terms(problem, rotated);
        let coeffs = self.term_coefficients(&terms);

        // c_w conj(z_dw) and c_w z_dw
        let weighted_diagonals: Vec<(Array1<c64>, Array1<c64>)> = (0..problem.ndirections())
            .map(|d| {
                let z = rotated.diagonal(d);
                let conj = Array1::from_shape_fn(nw, |w| coeffs[w] * z[w].conj());
                let plain = Array1::from_shape_fn(nw, |w| coeffs[w] * z[w]);
                (conj, plain)
            })
            .collect();

        let mut out = GaugeTangent::zeros_like(gauge);
        for k in 0..nkpts {
            let fixed = subspace.fixed_states[k];
            let extra = subspace.extra(k);

            let mut t = Array2::<c64>::zeros((nw, nw));
            let mut p = Array2::<c64>::zeros((problem.nbands(), nw));
            for (d, &weight) in mesh.weights.iter().enumerate() {
                let k1 = mesh.neighbors[d][k];
                let k2 = mesh.inverse[d][k];
                let (cz_conj, cz) = &weighted_diagonals[d];
                let here = &rotated.overlaps[d][k];
                let behind = &rotated.overlaps[d][k2];

                // T_ij += w (c_j conj(z_j) Z[k2]_ji - c_i conj(z_i) Z[k]_ji)
                for i in 0..nw {
                    for j in 0..nw {
                        t[[i, j]] += weight * (cz_conj[j] * behind[[j, i]] - cz_conj[i] * here[[j, i]]);
                    }
                }

                if extra > 0 {
                    let forward = problem.overlap(d, k).dot(&rotated.vectors[k1]);
                    let backward = dagger(problem.overlap(d, k2)).dot(&rotated.vectors[k2]);
                    p.scaled_add(c64::from(weight), &(forward * &cz_conj.view().insert_axis(Axis(0))));
                    p.scaled_add(c64::from(weight), &(backward * &cz.view().insert_axis(Axis(0))));
                }
            }

            out.rotations[k] = Array2::from_shape_fn((nw, nw), |(i, j)| {
                (t[[i, j]].conj() - t[[j, i]]) / nkpts as f64
            });

            if extra > 0 {
                let c = &gauge.coefficients[k];
                let full = p.dot(&dagger(&gauge.rotations[k]));
                let kmat = full.slice(s![fixed.., fixed..]).to_owned();
                let projected = &kmat - &c.dot(&dagger(c).dot(&kmat));
                out.coefficients[k] = projected.mapv(|x| x * (2.0 / nkpts as f64));
            }
        }
        out
    }
}
