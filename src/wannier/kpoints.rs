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

//! K-point meshes and the finite-difference geometry built on them.
//!
//! Reciprocal-space vectors are always fractional here (units of the reciprocal
//! lattice vectors, without the factor of 2π).

use crate::{Error, Result};
use crate::lattice::{self, M33, V3};

/// Tolerance used when matching k-points against each other.
pub const KPOINT_TOL: f64 = 1e-4;

/// Tolerance for recognizing the Gamma point.
pub const GAMMA_TOL: f64 = 1e-10;

/// Weights below this magnitude drop their direction from the stencil.
const WEIGHT_TOL: f64 = 1e-5;

const ALL_DIRECTIONS: [[i32; 3]; 6] = [
    [1, 0, 0], [0, 1, 0], [0, 0, 1],
    [1, 1, 0], [1, 0, 1], [0, 1, 1],
];

/// A Monkhorst-Pack mesh, `(i + 1/2) / n - 1/2` along each axis, in C order.
pub fn monkhorst_pack(size: [usize; 3]) -> Vec<V3> {
    mesh_with(size, |i, n| (i as f64 + 0.5) / n as f64 - 0.5)
}

/// A Gamma-centered mesh, `i / n` folded into `[-1/2, 1/2)`, in C order.
pub fn gamma_centered(size: [usize; 3]) -> Vec<V3> {
    mesh_with(size, |i, n| {
        let x = i as f64 / n as f64;
        if x >= 0.5 { x - 1.0 } else { x }
    })
}

fn mesh_with(size: [usize; 3], coord: impl Fn(usize, usize) -> f64) -> Vec<V3> {
    let mut out = Vec::with_capacity(size[0] * size[1] * size[2]);
    for a in 0..size[0] {
        for b in 0..size[1] {
            for c in 0..size[2] {
                out.push([coord(a, size[0]), coord(b, size[1]), coord(c, size[2])]);
            }
        }
    }
    out
}

/// Number of distinct k-point coordinates along each axis.
///
/// Fails unless the points form a complete product grid.
pub fn mesh_size(kpts: &[V3]) -> Result<[usize; 3]> {
    if kpts.is_empty() {
        return Err(Error::IrregularMesh("no k-points".into()));
    }

    let mut size = [0; 3];
    for axis in 0..3 {
        let mut values: Vec<f64> = kpts.iter().map(|k| k[axis]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        size[axis] = values.len();
    }

    let expected = size[0] * size[1] * size[2];
    if expected != kpts.len() {
        return Err(Error::IrregularMesh(format!(
            "{} k-points do not fill a {}x{}x{} grid", kpts.len(), size[0], size[1], size[2],
        )));
    }
    Ok(size)
}

/// Find `k1` in `kpts` and a shift `k0` with `k0 ∈ {0,1}³` such that
/// `kpts[k1] - k - g + k0 = 0`.
///
/// The shift is the reciprocal lattice vector that folds `k + g` back into the
/// list.  The unshifted match is preferred.
pub fn neighbor_k_search(k: &V3, g: &V3, kpts: &[V3], tol: f64) -> Option<(usize, [i32; 3])> {
    let mut shifts = vec![];
    for a in 0..2 {
        for b in 0..2 {
            for c in 0..2 {
                shifts.push([a, b, c]);
            }
        }
    }
    shifts.sort_by_key(|s: &[i32; 3]| s.iter().sum::<i32>());

    for k0 in &shifts {
        for (k1, kpt) in kpts.iter().enumerate() {
            let diff = [
                kpt[0] - k[0] - g[0] + k0[0] as f64,
                kpt[1] - k[1] - g[1] + k0[1] as f64,
                kpt[2] - k[2] - g[2] + k0[2] as f64,
            ];
            if lattice::norm(&diff) < tol {
                return Some((k1, *k0));
            }
        }
    }
    None
}

/// Finite-difference weights and directions for a (super)cell.
///
/// The directions are in units of the reciprocal mesh spacing.  The first three
/// are always present; the face diagonals appear only for non-orthogonal cells.
/// The weights satisfy `Σ_d w_d G_di G_dj = (cell cellᵀ)_ij` before normalization.
/// With `normalize`, they are scaled so that the largest magnitude is 1.
pub fn calculate_weights(cell: &M33, normalize: bool) -> (Vec<f64>, Vec<[i32; 3]>) {
    let g = lattice::metric(cell);
    let mut w = [0.0; 6];
    w[3] = g[0][1];
    w[4] = g[0][2];
    w[5] = g[1][2];
    w[0] = g[0][0] - w[3] - w[4];
    w[1] = g[1][1] - w[3] - w[5];
    w[2] = g[2][2] - w[4] - w[5];

    let mut weights = vec![];
    let mut directions = vec![];
    for d in 0..6 {
        if d < 3 || w[d].abs() > WEIGHT_TOL {
            weights.push(w[d]);
            directions.push(ALL_DIRECTIONS[d]);
        }
    }

    if normalize {
        let max = weights.iter().map(|w: &f64| w.abs()).fold(0.0, f64::max);
        for w in &mut weights {
            *w /= max;
        }
    }
    (weights, directions)
}

/// Index of the Gamma point.
pub fn search_for_gamma_point(kpts: &[V3]) -> Option<usize> {
    kpts.iter().position(|k| lattice::norm(k) < GAMMA_TOL)
}

/// The k-point mesh together with its neighbor graph.
///
/// For every direction `d` and k-point `k`, the neighbor `k1 = neighbors[d][k]`
/// satisfies `kpts[k1] = kpts[k] + G_d - translations[d][k]`, where
/// `G_d = directions[d] / kgrid`.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub cell: M33,
    pub kpts: Vec<V3>,
    pub kgrid: [usize; 3],
    /// The Born-von Kármán supercell, `cell` repeated `kgrid` times.
    pub supercell: M33,
    pub directions: Vec<[i32; 3]>,
    /// Normalized so the largest is 1.
    pub weights: Vec<f64>,
    pub unnormalized_weights: Vec<f64>,
    pub neighbors: Vec<Vec<usize>>,
    pub translations: Vec<Vec<[i32; 3]>>,
    /// `inverse[d][k1] = k` where `neighbors[d][k] = k1`.
    pub inverse: Vec<Vec<usize>>,
}

impl Mesh {
    pub fn new(cell: M33, kpts: Vec<V3>) -> Result<Mesh> {
        let kgrid = mesh_size(&kpts)?;
        let supercell = lattice::supercell(&cell, kgrid);
        let (weights, directions) = calculate_weights(&supercell, true);
        let (unnormalized_weights, _) = calculate_weights(&supercell, false);

        let mut neighbors = vec![];
        let mut translations = vec![];
        let mut inverse = vec![];
        for direction in &directions {
            let g = [
                direction[0] as f64 / kgrid[0] as f64,
                direction[1] as f64 / kgrid[1] as f64,
                direction[2] as f64 / kgrid[2] as f64,
            ];

            let mut ks = vec![];
            let mut shifts = vec![];
            for (kpt, k) in kpts.iter().enumerate() {
                let (k1, k0) = neighbor_k_search(k, &g, &kpts, KPOINT_TOL)
                    .ok_or(Error::NonPeriodicMesh { kpt, direction: *direction })?;
                ks.push(k1);
                shifts.push(k0);
            }

            let mut inv = vec![None; kpts.len()];
            for (k, &k1) in ks.iter().enumerate() {
                if inv[k1].is_some() {
                    return Err(Error::NonPeriodicMesh { kpt: k, direction: *direction });
                }
                inv[k1] = Some(k);
            }
            let inv = inv.into_iter().enumerate()
                .map(|(k1, k)| k.ok_or(Error::NonPeriodicMesh { kpt: k1, direction: *direction }))
                .collect::<Result<Vec<_>>>()?;

            neighbors.push(ks);
            translations.push(shifts);
            inverse.push(inv);
        }

        debug!(
            "k-point mesh {}x{}x{} with {} finite-difference directions",
            kgrid[0], kgrid[1], kgrid[2], directions.len(),
        );
        Ok(Mesh {
            cell, kpts, kgrid, supercell, directions,
            weights, unnormalized_weights, neighbors, translations, inverse,
        })
    }

    pub fn nkpts(&self) -> usize { self.kpts.len() }

    pub fn ndirections(&self) -> usize { self.directions.len() }

    /// The full difference `kpts[k1] - kpts[k] + k0` between a k-point and its
    /// neighbor, which differs from `G_d` only by rounding.
    pub fn difference(&self, d: usize, k: usize) -> V3 {
        let k1 = self.neighbors[d][k];
        let k0 = self.translations[d][k];
        let (a, b) = (&self.kpts[k], &self.kpts[k1]);
        [
            b[0] - a[0] + k0[0] as f64,
            b[1] - a[1] + k0[1] as f64,
            b[2] - a[2] + k0[2] as f64,
        ]
    }

    /// Lattice translations `R` with `|R_i| <= (kgrid_i - 1) / 2`.
    ///
    /// For an odd mesh these are exactly the translations a quantity sampled on the
    /// mesh can be Fourier-inverted over.
    pub fn lattice_translations(&self) -> Vec<[i32; 3]> {
        let range = |n: usize| {
            let half = (n as i32 - 1) / 2;
            -half..=half
        };
        let mut out = vec![];
        for a in range(self.kgrid[0]) {
            for b in range(self.kgrid[1]) {
                for c in range(self.kgrid[2]) {
                    out.push([a, b, c]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bravais_lattices() -> Vec<(&'static str, M33)> {
        let (a, b, c) = (3.0, 4.1, 5.3);
        let s3 = 3f64.sqrt();
        vec![
            ("cubic", [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]),
            ("fcc", [[0.0, a / 2.0, a / 2.0], [a / 2.0, 0.0, a / 2.0], [a / 2.0, a / 2.0, 0.0]]),
            ("bcc", [[-a / 2.0, a / 2.0, a / 2.0], [a / 2.0, -a / 2.0, a / 2.0], [a / 2.0, a / 2.0, -a / 2.0]]),
            ("tetragonal", [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, c]]),
            ("orthorhombic", [[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]]),
            ("base-centered", [[a / 2.0, -b / 2.0, 0.0], [a / 2.0, b / 2.0, 0.0], [0.0, 0.0, c]]),
            ("hexagonal", [[a, 0.0, 0.0], [-a / 2.0, a * s3 / 2.0, 0.0], [0.0, 0.0, c]]),
            ("rhombohedral", [[a, 0.0, 0.0], [a * 0.3, a * 0.954, 0.0], [a * 0.3, a * 0.2, a * 0.93]]),
            ("monoclinic", [[a, 0.0, 0.0], [0.0, b, 0.0], [c * 0.4, 0.0, c * 0.9]]),
            ("triclinic", [[a, 0.1, -0.2], [0.4, b, 0.3], [-0.5, 0.6, c]]),
        ]
    }

    #[test]
    fn weights_reproduce_the_metric() {
        for (name, cell) in bravais_lattices() {
            let (w, dirs) = calculate_weights(&cell, false);
            let g = lattice::metric(&cell);
            for i in 0..3 {
                for j in 0..3 {
                    let sum: f64 = w.iter().zip(&dirs)
                        .map(|(w, d)| w * (d[i] * d[j]) as f64)
                        .sum();
                    assert_close!(abs=1e-5, sum, g[i][j], "{} ({}, {})", name, i, j);
                }
            }
        }
    }

    #[test]
    fn orthogonal_cells_use_three_directions() {
        let cell = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]];
        let (w, dirs) = calculate_weights(&cell, true);
        assert_eq!(dirs, vec![[1, 0, 0], [0, 1, 0], [0, 0, 1]]);
        assert_close!(abs=1e-12, w, vec![0.25, 9.0 / 16.0, 1.0]);

        let hex = bravais_lattices()[6].1;
        let (w, dirs) = calculate_weights(&hex, true);
        assert_eq!(dirs.len(), 4);
        assert_close!(abs=1e-12, w.iter().map(|x| x.abs()).fold(0.0, f64::max), 1.0);
    }

    #[test]
    fn neighbors_on_regular_meshes() {
        for n in 1..5 {
            for &kpts in &[&monkhorst_pack([n, n, n]), &gamma_centered([n, n, n])] {
                for dir in &ALL_DIRECTIONS {
                    let g = [dir[0] as f64 / n as f64, dir[1] as f64 / n as f64, dir[2] as f64 / n as f64];
                    for k in kpts {
                        let (k1, k0) = neighbor_k_search(k, &g, kpts, KPOINT_TOL).unwrap();
                        for i in 0..3 {
                            let resid = kpts[k1][i] - k[i] - g[i] + k0[i] as f64;
                            assert!(resid.abs() < KPOINT_TOL);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn mesh_inverse_is_consistent() {
        let cell = bravais_lattices()[9].1;
        let mesh = Mesh::new(cell, monkhorst_pack([2, 3, 1])).unwrap();
        assert_eq!(mesh.kgrid, [2, 3, 1]);
        for d in 0..mesh.ndirections() {
            for k in 0..mesh.nkpts() {
                assert_eq!(mesh.inverse[d][mesh.neighbors[d][k]], k);
            }
        }
        assert_eq!(mesh.lattice_translations().len(), 3);
    }

    #[test]
    fn irregular_mesh() {
        let mut kpts = monkhorst_pack([2, 2, 2]);
        kpts.pop();
        match Mesh::new(bravais_lattices()[0].1, kpts) {
            Err(Error::IrregularMesh(_)) => {},
            r => panic!("unexpected: {:?}", r.map(|_| ())),
        }
    }

    #[test]
    fn gamma_point() {
        assert_eq!(search_for_gamma_point(&monkhorst_pack([2, 2, 2])), None);
        assert_eq!(search_for_gamma_point(&monkhorst_pack([3, 3, 3])), Some(13));
        assert_eq!(search_for_gamma_point(&gamma_centered([2, 4, 2])), Some(0));
    }
}
