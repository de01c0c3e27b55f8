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

//! Localized trial orbitals.
//!
//! A shell is a Gaussian `e^{-α r²}` times each of the `2l + 1` real solid
//! harmonics of angular momentum `l`.  They are projected onto the Bloch states
//! to build the `orbitals` initial guess.

use crate::{c64, Error, Result};
use crate::lattice::{self, M33, V3};
use crate::source::Atoms;
use crate::grid;

use std::f64::consts::PI;

use ndarray::{Array2, Array3};
use rand::Rng;

/// `e^{-α r²}` is dropped beyond `r² = GAUSSIAN_CUTOFF / α`.
const GAUSSIAN_CUTOFF: f64 = 40.0;

/// Random s orbitals are kept only this close (in Å) to some atom.
const S_ORBITAL_RADIUS: f64 = 1.5;

const MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// Atomic numbers that receive a set of d orbitals.
fn is_d_metal(z: u32) -> bool {
    match z {
        21..=30 | 39..=51 | 57..=83 | 89..=112 => true,
        _ => false,
    }
}

/// A shell of `2l + 1` Gaussian orbitals sharing a center.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrbitalShell {
    /// Cartesian.
    pub center: V3,
    pub l: u32,
    pub alpha: f64,
}

impl OrbitalShell {
    pub fn count(&self) -> usize { 2 * self.l as usize + 1 }

    /// Angular factors of the shell at a displacement from its center.
    fn harmonics(&self, r: &V3) -> Result<Vec<f64>> {
        let [x, y, z] = *r;
        Ok(match self.l {
            0 => vec![1.0],
            1 => vec![x, y, z],
            2 => vec![
                x * y,
                y * z,
                z * x,
                x * x - y * y,
                3.0 * z * z - lattice::dot(r, r),
            ],
            l => return Err(Error::Unsupported(format!("trial orbitals with l = {}", l))),
        })
    }

    /// The Bloch sums `Σ_T e^{2πi k·T} f(r - center - T·cell)` of every function
    /// in the shell, sampled on a grid over the unit cell.
    pub fn bloch_sums(&self, cell: &M33, shape: [usize; 3], kpt: &V3) -> Result<Vec<Array3<c64>>> {
        self.harmonics(&[0.0; 3])?;
        let cutoff_sq = GAUSSIAN_CUTOFF / self.alpha;

        // wrap the center into the cell; the wrapping contributes an overall phase
        let frac = lattice::cart_to_frac(&self.center, cell)
            .ok_or_else(|| Error::ShapeMismatch("singular cell".into()))?;
        let shift = [frac[0].floor(), frac[1].floor(), frac[2].floor()];
        let center = lattice::frac_to_cart(&lattice::sub(&frac, &shift), cell);
        let overall = c64::from_polar(1.0, -2.0 * PI * lattice::dot(kpt, &shift));

        let images: Vec<(V3, c64)> = lattice::images_within(cell, cutoff_sq.sqrt()).iter()
            .map(|t| {
                let tf = [t[0] as f64, t[1] as f64, t[2] as f64];
                let phase = c64::from_polar(1.0, 2.0 * PI * lattice::dot(kpt, &tf));
                (lattice::add(&center, &lattice::translation(t, cell)), overall * phase)
            })
            .collect();

        let mut out = vec![Array3::zeros((shape[0], shape[1], shape[2])); self.count()];
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                for l in 0..shape[2] {
                    let r = lattice::frac_to_cart(&lattice::grid_point((i, j, l), &shape), cell);
                    for (origin, phase) in &images {
                        let rel = lattice::sub(&r, origin);
                        let r_sq = lattice::dot(&rel, &rel);
                        if r_sq > cutoff_sq {
                            continue;
                        }
                        let radial = (-self.alpha * r_sq).exp();
                        for (m, y) in self.harmonics(&rel)?.into_iter().enumerate() {
                            out[m][[i, j, l]] += phase * (y * radial);
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Total number of functions in a list of shells.
pub fn count_functions(shells: &[OrbitalShell]) -> usize {
    shells.iter().map(OrbitalShell::count).sum()
}

/// Trial orbitals adding up to exactly `ntot` functions.
///
/// Every transition metal gets a set of d orbitals, dropping sets from the end
/// while they overshoot.  The rest are s orbitals at random points near the atoms.
pub fn init_orbitals<R>(atoms: &Atoms, cell: &M33, ntot: usize, rng: &mut R) -> Result<Vec<OrbitalShell>>
where R: Rng + ?Sized,
{
    let mut shells: Vec<_> = atoms.positions.iter().zip(&atoms.numbers)
        .filter(|&(_, &number)| is_d_metal(number))
        .map(|(position, _)| OrbitalShell { center: *position, l: 2, alpha: 1.5 })
        .collect();
    while count_functions(&shells) > ntot {
        shells.pop();
    }
    let count = count_functions(&shells);

    if count < ntot {
        shells.extend(arbitrary_s_orbitals(atoms, cell, ntot - count, rng)?);
    }
    trace!("{} trial shells for {} functions", shells.len(), ntot);
    Ok(shells)
}

/// `count` s orbitals at uniformly random points of the cell that lie within
/// 1.5 Å of some atom.
pub fn arbitrary_s_orbitals<R>(atoms: &Atoms, cell: &M33, count: usize, rng: &mut R) -> Result<Vec<OrbitalShell>>
where R: Rng + ?Sized,
{
    let mut shells = Vec::with_capacity(count);
    for _ in 0..count {
        let center = (0..MAX_PLACEMENT_ATTEMPTS)
            .map(|_| {
                let frac = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
                lattice::frac_to_cart(&frac, cell)
            })
            .find(|point| {
                atoms.positions.iter()
                    .any(|atom| lattice::norm(&lattice::sub(point, atom)) < S_ORBITAL_RADIUS)
            })
            .ok_or(Error::OrbitalPlacement { count, attempts: MAX_PLACEMENT_ATTEMPTS })?;
        shells.push(OrbitalShell { center, l: 0, alpha: 1.0 });
    }
    Ok(shells)
}

/// `proj_nw = Σ_s conj(ψ_n(s)) φ_w(s)` for the Bloch states at one k-point.
pub fn projections(
    shells: &[OrbitalShell],
    cell: &M33,
    kpt: &V3,
    states: &[Array3<c64>],
) -> Result<Array2<c64>> {
    let shape = match states.first() {
        Some(psi) => [psi.shape()[0], psi.shape()[1], psi.shape()[2]],
        None => return Ok(Array2::zeros((0, count_functions(shells)))),
    };

    let mut functions = vec![];
    for shell in shells {
        functions.extend(shell.bloch_sums(cell, shape, kpt)?);
    }
    Ok(grid::overlap_matrix(states, &functions))
}
