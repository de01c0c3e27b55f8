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

//! Small model systems shared by the unit tests.

use crate::kpoints::monkhorst_pack;
use crate::lattice::{M33, V3};
use crate::model::{ModelSite, ModelSystem};
use crate::source::GridData;

/// Width of the lone orbital in [`gamma_single_site`].
pub const SINGLE_SITE_WIDTH: f64 = 0.5;

fn cubic(a: f64) -> M33 {
    [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]
}

fn site(position: V3, onsite: f64, width: f64) -> ModelSite {
    ModelSite { position, number: 1, onsite, width }
}

fn model(a: f64, grid: usize, sites: Vec<ModelSite>) -> ModelSystem {
    ModelSystem {
        cell: cubic(a),
        sites,
        hopping: 1.0,
        decay: 1.0,
        grid: [grid; 3],
        fermi_level: 0.0,
    }
}

fn build(system: ModelSystem, kpts: Vec<V3>) -> GridData {
    system.grid_data(kpts).unwrap()
}

/// One orbital on a grid point, sampled at Γ.
pub fn gamma_single_site() -> GridData {
    let sites = vec![site([1.5, 2.25, 3.0], -1.0, SINGLE_SITE_WIDTH)];
    build(model(6.0, 24, sites), vec![[0.0; 3]])
}

/// Two equivalent orbitals related by a mirror plane, sampled at Γ.
pub fn gamma_two_sites() -> GridData {
    let sites = vec![
        site([2.0, 4.0, 4.0], -1.0, 0.5),
        site([6.0, 4.0, 4.0], -1.0, 0.5),
    ];
    build(model(8.0, 24, sites), vec![[0.0; 3]])
}

/// Two bands on a 2x2x2 mesh, with both sites well inside the cell.
pub fn kmesh_model() -> GridData {
    let sites = vec![
        site([0.9, 1.2, 1.5], -1.0, 0.35),
        site([2.1, 1.8, 1.5], -0.5, 0.35),
    ];
    build(model(3.0, 12, sites), monkhorst_pack([2, 2, 2]))
}

/// Three bands on a 2x1x1 mesh: one below the Fermi level and two well above it.
pub fn disentangle_model() -> GridData {
    let sites = vec![
        site([0.8, 2.0, 2.0], -6.0, 0.4),
        site([2.0, 2.6, 2.0], 2.0, 0.4),
        site([3.0, 1.6, 2.4], 3.0, 0.4),
    ];
    build(model(4.0, 12, sites), monkhorst_pack([2, 1, 1]))
}

/// Two bands on a 3x1x1 mesh.
pub fn odd_mesh_model() -> GridData {
    let sites = vec![
        site([1.0, 1.5, 1.5], -1.0, 0.35),
        site([2.2, 1.5, 1.8], 0.0, 0.35),
    ];
    build(model(3.0, 12, sites), monkhorst_pack([3, 1, 1]))
}
