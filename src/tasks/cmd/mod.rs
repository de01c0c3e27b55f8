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

use crate::FailResult;

use mlwf_tasks_config::ValidatedSettings;
use mlwf_wannier::{
    optimal_nwannier, resolve_subspace, BlochSource, GridData, OptimalNWannier, Problem, Status,
    Subspace, Wannier,
};
use mlwf_wannier::lattice::V3;

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

pub const GAUGE_FILENAME: &str = "gauge.json";
pub const SUMMARY_FILENAME: &str = "wannier.json";

/// Contents of `wannier.json`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Summary {
    pub nwannier: usize,
    pub fixed_states: Vec<usize>,
    /// The localization functional Ω.
    pub functional_value: f64,
    pub status: Status,
    pub centers: Vec<V3>,
    pub spreads: Vec<f64>,
    /// `spectral_weight[w][k][n]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spectral_weight: Option<Vec<Vec<Vec<f64>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdos: Option<PdosOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_nwannier: Option<OptimalNWannier>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PdosOutput {
    pub energies: Vec<f64>,
    /// `values[w][e]`
    pub values: Vec<Vec<f64>>,
}

/// Localize the states in `input` (a JSON `GridData`) and write the gauge and a
/// summary into `outdir`.
pub fn run_localize(settings: &ValidatedSettings, input: &Path, outdir: &Path) -> FailResult<Summary> {
    let data = GridData::load(input)?;
    let source = Some(&data as &dyn BlochSource);

    let problem = Problem::new(&data, settings.spin, settings.nbands)?;
    info!(
        "{} bands, {} k-points on a {:?} mesh, {} directions",
        problem.nbands(), problem.nkpts(), problem.mesh().kgrid, problem.ndirections(),
    );

    let mut subspace = resolve_subspace(
        &problem, settings.nwannier, settings.fixed_states.as_ref(), settings.fixed_energy,
    )?;
    info!("nwannier = {}, fixed states per k-point: {:?}", subspace.nwannier, subspace.fixed_states);

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let sweep = match &settings.optimal_nwannier {
        None => None,
        Some(sweep_settings) => {
            let result = optimal_nwannier(
                &problem, source, &subspace, settings.functional, settings.initial_guess,
                sweep_settings, &mut rng,
            )?;
            info!("Optimal nwannier: {}", result.nwannier);
            subspace = Subspace {
                nwannier: result.nwannier,
                fixed_states: subspace.fixed_states.iter().map(|&m| m.min(result.nwannier)).collect(),
            };
            Some(result)
        },
    };

    let mut wan = Wannier::initialize(
        &problem, subspace, settings.functional, settings.initial_guess, source, &mut rng,
    )?;
    wan.localize(&settings.localize);

    if let Some(cell) = settings.translate_to_cell {
        wan.translate_all_to_cell(cell);
    }

    let nwannier = wan.nwannier();
    let spectral_weight = match settings.spectral_weight {
        false => None,
        true => Some({
            (0..nwannier).map(|w| {
                wan.spectral_weight(w).outer_iter().map(|row| row.to_vec()).collect()
            }).collect()
        }),
    };
    let pdos = settings.pdos.as_ref().map(|pdos| {
        let energies = pdos.energies.to_vec();
        let values = (0..nwannier).map(|w| wan.pdos(w, &energies, pdos.width)).collect();
        PdosOutput { energies, values }
    });

    let summary = Summary {
        nwannier,
        fixed_states: wan.subspace().fixed_states.clone(),
        functional_value: wan.functional_value(),
        status: wan.status(),
        centers: wan.centers(),
        spreads: wan.spreads(),
        spectral_weight,
        pdos,
        optimal_nwannier: sweep,
    };

    mlwf_fs_util::create_dir_all(outdir)?;
    wan.save(outdir.join(GAUGE_FILENAME))?;
    serde_json::to_writer_pretty(mlwf_fs_util::create_text(outdir.join(SUMMARY_FILENAME))?, &summary)?;
    info!("Wrote results to '{}'", outdir.display());

    Ok(summary)
}
