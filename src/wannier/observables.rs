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

//! Quantities derived from a localized gauge.

use crate::{c64, Error, Result};
use crate::functional::localization_terms;
use crate::lattice::{self, V3};
use crate::source::BlochSource;
use crate::wannier::Wannier;
use crate::grid;

use std::f64::consts::PI;

use mlwf_linalg::dagger;
use ndarray::{s, Array1, Array2, Array3};

/// Selects a function, or a linear combination of functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Combination {
    Index(usize),
    Coefficients(Vec<c64>),
}

impl<'p> Wannier<'p> {
    /// Centers of the functions in Cartesian coordinates, folded into the
    /// Born-von Kármán supercell.
    pub fn centers(&self) -> Vec<V3> {
        let mesh = self.problem().mesh();
        (0..self.nwannier())
            .map(|w| {
                let mut frac = [0.0; 3];
                for d in 0..3 {
                    let z = self.rotated().averages[d][[w, w]];
                    frac[d] = (-z.arg() / (2.0 * PI)).rem_euclid(1.0);
                }
                lattice::frac_to_cart(&frac, &mesh.supercell)
            })
            .collect()
    }

    /// Quadratic spreads `-Σ_d w_d ln|Z_d,ww|² / (2π)²` (in Å²), using the
    /// unnormalized weights.
    pub fn spreads(&self) -> Vec<f64> {
        let weights = &self.problem().mesh().unnormalized_weights;
        (0..self.nwannier())
            .map(|w| {
                let sum: f64 = weights.iter().enumerate()
                    .map(|(d, weight)| weight * self.rotated().averages[d][[w, w]].norm_sqr().ln())
                    .sum();
                -sum / (2.0 * PI).powi(2)
            })
            .collect()
    }

    /// `|Z_d,ww|²`, indexed `[d, w]`.
    pub fn square_modulus_of_z_diagonal(&self) -> Array2<f64> {
        let averages = &self.rotated().averages;
        Array2::from_shape_fn((averages.len(), self.nwannier()), |(d, w)| averages[d][[w, w]].norm_sqr())
    }

    /// Each function's share `Σ_d w_d |Z_d,ww|²` of the functional, with the
    /// normalized weights.
    pub fn spread_contributions(&self) -> Array1<f64> {
        localization_terms(self.problem(), self.rotated())
    }

    /// `|V_k[n, w]|² / Nk`, indexed `[k, n]`.  Sums to 1 over all entries.
    pub fn spectral_weight(&self, w: usize) -> Array2<f64> {
        let nkpts = self.problem().nkpts();
        let vectors = &self.rotated().vectors;
        Array2::from_shape_fn((nkpts, self.problem().nbands()), |(k, n)| {
            vectors[k][[n, w]].norm_sqr() / nkpts as f64
        })
    }

    /// Projected density of states of one function, with Gaussian broadening.
    pub fn pdos(&self, w: usize, energies: &[f64], width: f64) -> Vec<f64> {
        let spectral = self.spectral_weight(w);
        let norm = PI.sqrt() * width;
        let mut dos = vec![0.0; energies.len()];
        for (k, row) in spectral.outer_iter().enumerate() {
            for (&weight, &eig) in row.iter().zip(self.problem().eigenvalues(k)) {
                for (out, &energy) in dos.iter_mut().zip(energies) {
                    let x = ((energy - eig) / width).powi(2);
                    *out += weight * (-x.max(0.0).min(40.0)).exp() / norm;
                }
            }
        }
        dos
    }

    /// Translate one function by a lattice vector (in units of the unit cell).
    pub fn translate(&mut self, w: usize, translation: [i32; 3]) {
        let mut gauge = self.gauge().clone();
        let t = [translation[0] as f64, translation[1] as f64, translation[2] as f64];
        for (u, kpt) in gauge.rotations.iter_mut().zip(&self.problem().mesh().kpts) {
            let phase = c64::from_polar(1.0, -2.0 * PI * lattice::dot(kpt, &t));
            u.column_mut(w).mapv_inplace(|x| x * phase);
        }
        self.replace_gauge(gauge);
    }

    /// Translate one function so that its center lies in the given unit cell.
    pub fn translate_to_cell(&mut self, w: usize, cell: [i32; 3]) {
        let translation = self.translation_to_cell(w, cell);
        self.translate(w, translation);
    }

    /// Translate every function into the given unit cell.
    pub fn translate_all_to_cell(&mut self, cell: [i32; 3]) {
        for w in 0..self.nwannier() {
            self.translate_to_cell(w, cell);
        }
    }

    fn translation_to_cell(&self, w: usize, cell: [i32; 3]) -> [i32; 3] {
        let kgrid = self.problem().mesh().kgrid;
        let mut out = [0; 3];
        for d in 0..3 {
            let z = self.rotated().averages[d][[w, w]];
            let scaled = -z.arg() / (2.0 * PI) * kgrid[d] as f64;
            out[d] = cell[d] - scaled.floor() as i32;
        }
        out
    }

    /// `d_ij = |c_i - c_j - R|` for a lattice vector `R`.
    pub fn distances(&self, translation: [i32; 3]) -> Array2<f64> {
        let centers = self.centers();
        let shift = lattice::translation(&translation, &self.problem().mesh().cell);
        Array2::from_shape_fn((centers.len(), centers.len()), |(i, j)| {
            let diff = lattice::sub(&lattice::sub(&centers[i], &centers[j]), &shift);
            lattice::norm(&diff)
        })
    }

    /// `H(k) = V_k† diag(ε_k) V_k`
    pub fn hamiltonian(&self, k: usize) -> Array2<c64> {
        let v = &self.rotated().vectors[k];
        let eigs = self.problem().eigenvalues(k);
        let mut scaled = v.clone();
        for (mut row, &e) in scaled.outer_iter_mut().zip(eigs) {
            row.mapv_inplace(|x| x * e);
        }
        dagger(v).dot(&scaled)
    }

    /// `H(R) = (1/Nk) Σ_k e^{-2πi k·R} H(k)`
    pub fn hopping(&self, translation: [i32; 3]) -> Array2<c64> {
        let nw = self.nwannier();
        let nkpts = self.problem().nkpts();
        let t = [translation[0] as f64, translation[1] as f64, translation[2] as f64];
        let mut out = Array2::zeros((nw, nw));
        for (k, kpt) in self.problem().mesh().kpts.iter().enumerate() {
            let phase = c64::from_polar(1.0, -2.0 * PI * lattice::dot(kpt, &t));
            out.scaled_add(phase, &self.hamiltonian(k));
        }
        out.mapv(|x| x / nkpts as f64)
    }

    /// The Hamiltonian at an arbitrary k-point, Fourier-interpolated from the
    /// hoppings.
    ///
    /// The hoppings are taken from a copy with every function translated into the
    /// home cell; `self` is unchanged.
    pub fn hamiltonian_kpoint(&self, kpt: &V3) -> Array2<c64> {
        let mut home = self.clone();
        home.translate_all_to_cell([0, 0, 0]);

        let nw = self.nwannier();
        let mut out = Array2::zeros((nw, nw));
        for translation in self.problem().mesh().lattice_translations() {
            let t = [translation[0] as f64, translation[1] as f64, translation[2] as f64];
            let phase = c64::from_polar(1.0, 2.0 * PI * lattice::dot(kpt, &t));
            out.scaled_add(phase, &home.hopping(translation));
        }
        out
    }

    /// A function (or combination of functions) on the real-space grid of a
    /// supercell.
    ///
    /// `repeat` defaults to the k-point mesh, in which case the result has unit
    /// norm for a normalized combination.
    pub fn function(
        &self,
        source: &dyn BlochSource,
        combination: &Combination,
        repeat: Option<[usize; 3]>,
    ) -> Result<Array3<c64>> {
        let problem = self.problem();
        let mesh = problem.mesh();
        let nw = self.nwannier();
        let coeffs: Array1<c64> = match combination {
            Combination::Index(w) if *w < nw => {
                Array1::from_shape_fn(nw, |i| c64::from(if i == *w { 1.0 } else { 0.0 }))
            },
            Combination::Coefficients(c) if c.len() == nw => Array1::from(c.clone()),
            _ => return Err(Error::ShapeMismatch(format!("{:?} does not select among {} functions", combination, nw))),
        };

        let repeat = repeat.unwrap_or(mesh.kgrid);
        let dim = source.grid_shape();
        let mut out = Array3::zeros((dim[0] * repeat[0], dim[1] * repeat[1], dim[2] * repeat[2]));
        for (k, kpt) in mesh.kpts.iter().enumerate() {
            let band_coeffs = self.rotated().vectors[k].dot(&coeffs);
            let states = source.wavefunctions(k, problem.spin(), problem.nbands());
            let cell_function = match grid::combine(band_coeffs.view(), &states) {
                Some(f) => f,
                None => continue,
            };

            for a in 0..repeat[0] {
                for b in 0..repeat[1] {
                    for c in 0..repeat[2] {
                        let t = [a as f64, b as f64, c as f64];
                        let phase = c64::from_polar(1.0, 2.0 * PI * lattice::dot(kpt, &t));
                        let mut tile = out.slice_mut(s![
                            a * dim[0]..(a + 1) * dim[0],
                            b * dim[1]..(b + 1) * dim[1],
                            c * dim[2]..(c + 1) * dim[2],
                        ]);
                        tile.zip_mut_with(&cell_function, |o, &x| *o += phase * x);
                    }
                }
            }
        }
        let nkpts = problem.nkpts() as f64;
        out.mapv_inplace(|x| x / nkpts);
        Ok(out)
    }
}
