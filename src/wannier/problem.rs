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

//! Immutable problem data derived from a Bloch source.

use crate::{c64, Error, Result};
use crate::kpoints::Mesh;
use crate::source::{Atoms, BlochSource};

use ndarray::{Array1, Array2};

/// Everything the localization needs to know about the Bloch states.
///
/// Once built, a `Problem` is shared read-only by any number of gauges.
#[derive(Debug, Clone)]
pub struct Problem {
    mesh: Mesh,
    spin: usize,
    nbands: usize,
    /// `overlaps[d][k]` is the `nbands x nbands` matrix
    /// `Σ_s conj(ψ_nk(s)) ψ_mk1(s) e^{-2πi G_d·s}` with `k1 = neighbors[d][k]`.
    overlaps: Vec<Vec<Array2<c64>>>,
    eigenvalues: Vec<Array1<f64>>,
    fermi_level: f64,
    atoms: Atoms,
}

impl Problem {
    /// Read the lowest `nbands` bands of one spin channel and compute their overlaps.
    pub fn new(source: &dyn BlochSource, spin: usize, nbands: Option<usize>) -> Result<Problem> {
        if spin >= source.number_of_spins() {
            return Err(Error::ShapeMismatch(format!(
                "spin {} requested, but there are {} spin channels", spin, source.number_of_spins(),
            )));
        }
        let available = source.number_of_bands();
        let nbands = nbands.unwrap_or(available);
        if nbands > available || nbands == 0 {
            return Err(Error::ShapeMismatch(format!(
                "{} bands requested, but there are {}", nbands, available,
            )));
        }

        if source.grid_shape().iter().any(|&n| n == 0) {
            return Err(Error::ShapeMismatch("empty wavefunction grid".into()));
        }

        let mesh = Mesh::new(source.cell(), source.bz_kpoints())?;
        let mut overlaps = vec![];
        for d in 0..mesh.ndirections() {
            let by_kpt = (0..mesh.nkpts())
                .map(|k| {
                    let k1 = mesh.neighbors[d][k];
                    source.localization_matrix(k, k1, &mesh.difference(d, k), spin, nbands)
                })
                .collect();
            overlaps.push(by_kpt);
        }
        info!("Computed overlaps for {} bands at {} k-points", nbands, mesh.nkpts());

        let eigenvalues = (0..mesh.nkpts())
            .map(|k| source.eigenvalues(k, spin).into_iter().take(nbands).collect())
            .collect();

        Problem::from_parts(mesh, overlaps, eigenvalues, source.fermi_level(), source.atoms())
            .map(|problem| Problem { spin, ..problem })
    }

    /// Assemble a problem from precomputed overlaps.
    pub fn from_parts(
        mesh: Mesh,
        overlaps: Vec<Vec<Array2<c64>>>,
        eigenvalues: Vec<Array1<f64>>,
        fermi_level: f64,
        atoms: Atoms,
    ) -> Result<Problem> {
        let nbands = eigenvalues.first().map_or(0, |e| e.len());
        let fail = |msg: String| Err(Error::ShapeMismatch(msg));

        if eigenvalues.len() != mesh.nkpts() || eigenvalues.iter().any(|e| e.len() != nbands) {
            return fail(format!("expected {} bands at each of {} k-points", nbands, mesh.nkpts()));
        }
        if overlaps.len() != mesh.ndirections() {
            return fail(format!("expected overlaps along {} directions", mesh.ndirections()));
        }
        for by_kpt in &overlaps {
            if by_kpt.len() != mesh.nkpts() || by_kpt.iter().any(|z| z.dim() != (nbands, nbands)) {
                return fail(format!("expected {0}x{0} overlaps at each k-point", nbands));
            }
        }

        Ok(Problem { mesh, spin: 0, nbands, overlaps, eigenvalues, fermi_level, atoms })
    }

    pub fn mesh(&self) -> &Mesh { &self.mesh }

    pub fn spin(&self) -> usize { self.spin }

    pub fn nbands(&self) -> usize { self.nbands }

    pub fn nkpts(&self) -> usize { self.mesh.nkpts() }

    pub fn ndirections(&self) -> usize { self.mesh.ndirections() }

    pub fn overlap(&self, d: usize, k: usize) -> &Array2<c64> { &self.overlaps[d][k] }

    pub fn eigenvalues(&self, k: usize) -> &Array1<f64> { &self.eigenvalues[k] }

    pub fn fermi_level(&self) -> f64 { self.fermi_level }

    pub fn atoms(&self) -> &Atoms { &self.atoms }
}
