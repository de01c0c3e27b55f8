/* ********************************************************************** **
**  This file is part of mlwf.                                            **
**                                                                        **
**  mlwf is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of mlwf is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

//! Model inputs shared by the integration tests.

use mlwf_wannier::kpoints::monkhorst_pack;
use mlwf_wannier::lattice::V3;
use mlwf_wannier::{GridData, ModelSite, ModelSystem};

use std::path::{Path, PathBuf};

pub fn cubic_model(a: f64, grid: usize, sites: &[(V3, f64)]) -> ModelSystem {
    ModelSystem {
        cell: [[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]],
        sites: sites.iter().map(|&(position, onsite)| {
            ModelSite { position, number: 1, onsite, width: 0.5 }
        }).collect(),
        hopping: 1.0,
        decay: 1.0,
        grid: [grid; 3],
        fermi_level: 0.0,
    }
}

/// Two equivalent sites at Γ.
pub fn dimer() -> GridData {
    let model = cubic_model(8.0, 24, &[([2.0, 4.0, 4.0], -1.0), ([6.0, 4.0, 4.0], -1.0)]);
    model.grid_data(vec![[0.0; 3]]).unwrap()
}

/// One occupied band and two empty ones on a 2x1x1 mesh.
pub fn entangled() -> GridData {
    let model = cubic_model(4.0, 12, &[
        ([0.8, 2.0, 2.0], -6.0),
        ([2.0, 2.6, 2.0], 2.0),
        ([3.0, 1.6, 2.4], 3.0),
    ]);
    model.grid_data(monkhorst_pack([2, 1, 1])).unwrap()
}

pub fn write_input(dir: &Path, data: &GridData) -> PathBuf {
    let path = dir.join("input.json");
    data.save(&path).unwrap();
    path
}
