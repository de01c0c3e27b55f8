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

//! A synthetic tight-binding system with exactly known Wannier functions.
//!
//! Each site carries one Gaussian orbital.  The Bloch sums of these orbitals are
//! orthonormalized on the grid, and the Bloch states are the eigenvectors of a
//! tight-binding Hamiltonian with exponentially decaying hoppings, expressed in
//! that orthonormal basis.  Localizing the resulting bands recovers orbitals
//! centered on the sites.

use crate::{c64, Result};
use crate::lattice::{self, M33, V3};
use crate::orbitals::OrbitalShell;
use crate::source::{Atoms, GridData};
use crate::grid;

use std::f64::consts::PI;

use ndarray::Array2;

/// Hoppings are neglected beyond this many decay lengths.
const HOPPING_RANGE: f64 = 30.0;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ModelSite {
    /// Cartesian.
    pub position: V3,
    /// Atomic number reported for the site.
    pub number: u32,
    pub onsite: f64,
    /// Standard deviation of the orbital's density along each axis.
    pub width: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ModelSystem {
    pub cell: M33,
    pub sites: Vec<ModelSite>,
    /// Hopping at zero distance.  Hoppings are `-hopping · e^{-d / decay}`.
    pub hopping: f64,
    pub decay: f64,
    /// Real-space grid for the wavefunctions.
    pub grid: [usize; 3],
    pub fermi_level: f64,
}

impl ModelSite {
    fn shell(&self) -> OrbitalShell {
        OrbitalShell { center: self.position, l: 0, alpha: 1.0 / (4.0 * self.width * self.width) }
    }
}

impl ModelSystem {
    pub fn atoms(&self) -> Atoms {
        Atoms {
            positions: self.sites.iter().map(|s| s.position).collect(),
            numbers: self.sites.iter().map(|s| s.number).collect(),
        }
    }

    /// `H_ij(k) = ε_i δ_ij + Σ_T t(|τ_j + T - τ_i|) e^{2πi k·T}`, without the
    /// self-hopping of a site.
    pub fn hamiltonian(&self, kpt: &V3) -> Array2<c64> {
        let n = self.sites.len();
        let cutoff = HOPPING_RANGE * self.decay;
        let images = lattice::images_within(&self.cell, cutoff);

        let mut h = Array2::zeros((n, n));
        for (i, a) in self.sites.iter().enumerate() {
            h[[i, i]] += c64::from(a.onsite);
            for (j, b) in self.sites.iter().enumerate() {
                for t in &images {
                    if i == j && t == &[0, 0, 0] {
                        continue;
                    }
                    let r = lattice::add(&b.position, &lattice::translation(t, &self.cell));
                    let dist = lattice::norm(&lattice::sub(&r, &a.position));
                    if dist > cutoff {
                        continue;
                    }
                    let tf = [t[0] as f64, t[1] as f64, t[2] as f64];
                    let phase = c64::from_polar(1.0, 2.0 * PI * lattice::dot(kpt, &tf));
                    h[[i, j]] += phase * (-self.hopping * (-dist / self.decay).exp());
                }
            }
        }
        h
    }

    /// Bloch states and band energies on the given k-points, as a single spin channel.
    pub fn grid_data(&self, kpts: Vec<V3>) -> Result<GridData> {
        let mut eigenvalues = vec![];
        let mut wavefunctions = vec![];
        for kpt in &kpts {
            let mut orbitals = vec![];
            for site in &self.sites {
                orbitals.extend(site.shell().bloch_sums(&self.cell, self.grid, kpt)?);
            }
            let overlap = grid::overlap_matrix(&orbitals, &orbitals);
            let orthonormalize = mlwf_linalg::inverse_sqrt(&overlap)?;

            let (energies, vectors) = mlwf_linalg::eigh(&self.hamiltonian(kpt));
            let coeffs = orthonormalize.dot(&vectors);
            let states: Vec<_> = coeffs.columns().into_iter()
                .filter_map(|c| grid::combine(c, &orbitals))
                .collect();

            eigenvalues.push(energies.to_vec());
            wavefunctions.push(states);
        }

        Ok(GridData {
            cell: self.cell,
            atoms: self.atoms(),
            kpoints: kpts,
            fermi_level: self.fermi_level,
            eigenvalues: vec![eigenvalues],
            wavefunctions: vec![wavefunctions],
        })
    }
}
