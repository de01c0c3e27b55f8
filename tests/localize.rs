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

#[macro_use] extern crate mlwf_assert_close;

mod shared;

use mlwf_tasks::{run_localize, Summary};
use mlwf_tasks_config::{Settings, ValidatedSettings, YamlRead};
use mlwf_wannier::{Functional, Problem, SavedGauge, Wannier};

use pretty_assertions::assert_eq;
use tempdir::TempDir;

fn settings(yaml: &str) -> ValidatedSettings {
    Settings::from_reader(yaml.as_bytes()).unwrap().validate().unwrap()
}

fn sorted_by_x(mut points: Vec<[f64; 3]>) -> Vec<[f64; 3]> {
    points.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap());
    points
}

#[test]
fn dimer_localizes_onto_its_sites() {
    let _ = env_logger::try_init();
    let tmp = TempDir::new("mlwf-localize").unwrap();
    let data = shared::dimer();
    let input = shared::write_input(tmp.path(), &data);
    let outdir = tmp.path().join("out");

    let settings = settings("
nwannier: 2
initial-guess: random
seed: 11
localize:
  max-iterations: 5000
translate-to-cell: [0, 0, 0]
");
    let summary = run_localize(&settings, &input, &outdir).unwrap();
    assert_eq!(summary.nwannier, 2);
    assert_eq!(summary.fixed_states, vec![2]);
    assert_close!(abs=1e-3, sorted_by_x(summary.centers.clone()), sorted_by_x(data.atoms.positions.clone()));

    // both files are written, and the summary file matches the return value
    let written: Summary = serde_json::from_reader(mlwf_fs_util::open_text(outdir.join("wannier.json")).unwrap()).unwrap();
    assert_eq!(written, summary);

    let saved = SavedGauge::load(outdir.join("gauge.json")).unwrap();
    assert_eq!(saved.nwannier, 2);

    let problem = Problem::new(&data, 0, None).unwrap();
    let wan = Wannier::load(&problem, Functional::Std, outdir.join("gauge.json")).unwrap();
    assert_close!(rel=1e-10, wan.functional_value(), summary.functional_value);
}

#[test]
fn scdm_guess_localizes_the_dimer() {
    let _ = env_logger::try_init();
    let tmp = TempDir::new("mlwf-localize").unwrap();
    let data = shared::dimer();
    let input = shared::write_input(tmp.path(), &data);

    let summary = run_localize(&settings("{nwannier: 2, initial-guess: scdm}"), &input, &tmp.path().join("out")).unwrap();
    assert!(summary.status.is_converged(), "{:?}", summary.status);
    assert_close!(abs=1e-3, sorted_by_x(summary.centers), sorted_by_x(data.atoms.positions.clone()));
}

#[test]
fn automatic_subspace_with_extras() {
    let _ = env_logger::try_init();
    let tmp = TempDir::new("mlwf-localize").unwrap();
    let data = shared::entangled();
    let input = shared::write_input(tmp.path(), &data);

    let settings = settings("
nwannier: auto
functional: var
seed: 5
localize:
  max-iterations: 500
optimal-nwannier:
  nwrange: 2
  random-reps: 1
spectral-weight: true
pdos:
  energies: {min: -10.0, max: 10.0, step: 0.5}
  width: 0.5
");
    let summary = run_localize(&settings, &input, &tmp.path().join("out")).unwrap();

    let sweep = summary.optimal_nwannier.clone().unwrap();
    let tried: Vec<usize> = sweep.candidates.iter().map(|c| c.0).collect();
    assert_eq!(tried, vec![1, 2]);
    assert_eq!(summary.nwannier, sweep.nwannier);
    assert!(summary.fixed_states.iter().all(|&m| m == 1));

    let nw = summary.nwannier;
    let weights = summary.spectral_weight.clone().unwrap();
    assert_eq!(weights.len(), nw);
    for w in &weights {
        assert_eq!(w.len(), 2);
        assert_close!(rel=1e-9, w.iter().flatten().sum::<f64>(), 1.0);
    }

    let pdos = summary.pdos.clone().unwrap();
    assert_eq!(pdos.energies.len(), 41);
    assert_eq!(pdos.values.len(), nw);
    assert!(pdos.values.iter().flatten().all(|&x| x >= 0.0));
    assert_eq!(summary.centers.len(), nw);
    assert_eq!(summary.spreads.len(), nw);
}

#[test]
fn bad_inputs_are_reported() {
    let tmp = TempDir::new("mlwf-localize").unwrap();
    let data = shared::dimer();
    let input = shared::write_input(tmp.path(), &data);

    let err = run_localize(&settings("{nwannier: 3}"), &input, &tmp.path().join("out")).unwrap_err();
    assert!(err.to_string().contains("bands"), "{}", err);

    let err = run_localize(&settings("{nwannier: 1}"), &tmp.path().join("missing.json"), &tmp.path().join("out")).unwrap_err();
    assert!(err.to_string().contains("missing.json"), "{}", err);
}
