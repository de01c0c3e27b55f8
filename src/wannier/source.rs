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

//! Where Bloch states come from.

use crate::{c64, Error, Result};
use crate::lattice::{M33, V3};
use crate::orbitals::{self, OrbitalShell};
use crate::grid;

use std::path::Path;

use ndarray::{Array2, Array3};

/// Atomic structure, in Cartesian coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Atoms {
    pub positions: Vec<V3>,
    pub numbers: Vec<u32>,
}

impl Atoms {
    pub fn len(&self) -> usize { self.positions.len() }

    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
}

/// A provider of Bloch states on a k-point mesh.
///
/// Wavefunctions are periodic-cell-sampled complex grids.  All bands at all
/// k-points must share one grid shape, and states at a single k-point should be
/// orthonormal under the plain sum over grid points.
pub trait BlochSource {
    fn cell(&self) -> M33;

    fn atoms(&self) -> Atoms;

    /// Fractional k-points, in mesh order.
    fn bz_kpoints(&self) -> Vec<V3>;

    fn number_of_spins(&self) -> usize;

    fn number_of_bands(&self) -> usize;

    fn fermi_level(&self) -> f64;

    fn eigenvalues(&self, kpt: usize, spin: usize) -> Vec<f64>;

    /// Shape of the real-space grid shared by all wavefunctions.
    fn grid_shape(&self) -> [usize; 3];

    /// The full Bloch function `ψ_nk` (including its phase) on the unit cell grid.
    fn pseudo_wave_function(&self, band: usize, kpt: usize, spin: usize) -> Array3<c64>;

    /// The lowest `nbands` wavefunctions at one k-point.
    fn wavefunctions(&self, kpt: usize, spin: usize, nbands: usize) -> Vec<Array3<c64>> {
        (0..nbands).map(|n| self.pseudo_wave_function(n, kpt, spin)).collect()
    }

    /// `Z_nm = Σ_s conj(ψ_n,kpt(s)) ψ_m,neighbor(s) e^{-2πi b·s}` over the lowest
    /// `nbands` bands.
    fn localization_matrix(&self, kpt: usize, neighbor: usize, b: &V3, spin: usize, nbands: usize) -> Array2<c64> {
        grid::localization_matrix(
            &self.wavefunctions(kpt, spin, nbands),
            &self.wavefunctions(neighbor, spin, nbands),
            b,
        )
    }

    /// `proj_nw = Σ_s conj(ψ_n(s)) φ_w(s)` of trial orbitals at one k-point.
    fn projections(&self, shells: &[OrbitalShell], kpt: usize, spin: usize, nbands: usize) -> Result<Array2<c64>> {
        let kpts = self.bz_kpoints();
        orbitals::projections(shells, &self.cell(), &kpts[kpt], &self.wavefunctions(kpt, spin, nbands))
    }
}

/// Bloch states stored in memory, and the file format used to exchange them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GridData {
    pub cell: M33,
    pub atoms: Atoms,
    pub kpoints: Vec<V3>,
    pub fermi_level: f64,
    /// Indexed as `[spin][kpt][band]`.
    pub eigenvalues: Vec<Vec<Vec<f64>>>,
    /// Indexed as `[spin][kpt][band]`.
    pub wavefunctions: Vec<Vec<Vec<Array3<c64>>>>,
}

impl GridData {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GridData> {
        let data: GridData = serde_json::from_reader(mlwf_fs_util::open_text(path)?)?;
        data.validate()?;
        Ok(data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serde_json::to_writer(mlwf_fs_util::create_text(path)?, self)?;
        Ok(())
    }

    /// Check that all arrays agree on the number of spins, k-points and bands.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::ShapeMismatch(msg));

        if self.atoms.positions.len() != self.atoms.numbers.len() {
            return fail(format!(
                "{} atomic positions but {} atomic numbers",
                self.atoms.positions.len(), self.atoms.numbers.len(),
            ));
        }

        let nspins = self.eigenvalues.len();
        if nspins == 0 || self.wavefunctions.len() != nspins {
            return fail(format!(
                "eigenvalues have {} spins, wavefunctions have {}", nspins, self.wavefunctions.len(),
            ));
        }

        let nkpts = self.kpoints.len();
        let nbands = self.number_of_bands();
        let shape = match self.wavefunctions.first().and_then(|s| s.first()).and_then(|k| k.first()) {
            Some(psi) => psi.shape().to_vec(),
            None => return fail("no wavefunctions".into()),
        };
        for (spin, (eigs, psis)) in self.eigenvalues.iter().zip(&self.wavefunctions).enumerate() {
            if eigs.len() != nkpts || psis.len() != nkpts {
                return fail(format!("spin {}: expected data at {} k-points", spin, nkpts));
            }
            for (kpt, (eigs, psis)) in eigs.iter().zip(psis).enumerate() {
                if eigs.len() != nbands || psis.len() != nbands {
                    return fail(format!("spin {} kpt {}: expected {} bands", spin, kpt, nbands));
                }
                if let Some(bad) = psis.iter().find(|psi| psi.shape() != &shape[..]) {
                    return fail(format!(
                        "spin {} kpt {}: grid shape {:?} differs from {:?}", spin, kpt, bad.shape(), shape,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl BlochSource for GridData {
    fn cell(&self) -> M33 { self.cell }

    fn atoms(&self) -> Atoms { self.atoms.clone() }

    fn bz_kpoints(&self) -> Vec<V3> { self.kpoints.clone() }

    fn number_of_spins(&self) -> usize { self.eigenvalues.len() }

    fn number_of_bands(&self) -> usize {
        self.eigenvalues.first()
            .and_then(|spin| spin.first())
            .map_or(0, |kpt| kpt.len())
    }

    fn fermi_level(&self) -> f64 { self.fermi_level }

    fn eigenvalues(&self, kpt: usize, spin: usize) -> Vec<f64> {
        self.eigenvalues[spin][kpt].clone()
    }

    fn grid_shape(&self) -> [usize; 3] {
        match self.wavefunctions.first().and_then(|s| s.first()).and_then(|k| k.first()) {
            Some(psi) => [psi.shape()[0], psi.shape()[1], psi.shape()[2]],
            None => [0; 3],
        }
    }

    fn pseudo_wave_function(&self, band: usize, kpt: usize, spin: usize) -> Array3<c64> {
        self.wavefunctions[spin][kpt][band].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    #[test]
    fn file_round_trip() {
        let data = test_util::gamma_single_site();
        let tmp = tempdir::TempDir::new("mlwf-source").unwrap();
        let path = tmp.path().join("data.json");
        data.save(&path).unwrap();

        let loaded = GridData::load(&path).unwrap();
        pretty_assertions::assert_eq!(loaded.cell, data.cell);
        pretty_assertions::assert_eq!(loaded.atoms, data.atoms);
        assert_eq!(loaded.wavefunctions, data.wavefunctions);
    }

    #[test]
    fn validation_catches_missing_bands() {
        let mut data = test_util::gamma_single_site();
        data.wavefunctions[0][0].clear();
        match data.validate() {
            Err(Error::ShapeMismatch(_)) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
