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

#![allow(non_snake_case)]

// Crate where serde_yaml code for the 'tasks' crate is monomorphized,
// because this is a huge compile time sink.
//
// The functions here also make use of serde_ignored to catch typos in the config.

// NOTE: Please make sure to use the YamlRead trait!
//       DO NOT USE serde_yaml::from_{reader,value,etc.} OUTSIDE THIS CRATE
//       or else you defeat the entire reason for its existence.

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate failure;

use std::io::Read;

pub use mlwf_wannier::{
    FixedStates, Functional, InitialGuess, LocalizeSettings, NWannier, OptimalNWannierSettings,
};

mod validation;
pub use crate::validation::ValidatedSettings;

/// Provides an alternative to serde_yaml::from_reader where all of the
/// expensive codegen has already been performed in this crate.
pub trait YamlRead: for <'de> serde::Deserialize<'de> {
    fn from_reader(mut r: impl Read) -> Result<Self, serde_yaml::Error>
    { YamlRead::from_dyn_reader(&mut r) }

    fn from_dyn_reader(r: &mut dyn Read) -> Result<Self, serde_yaml::Error> {
        // serde_ignored needs a Deserializer, and serde_yaml only offers
        // Deserialize for Value when reading from a Read.
        Self::from_value(value_from_dyn_reader(r)?)
    }

    fn from_value(value: serde_yaml::Value) -> Result<Self, serde_yaml::Error>;
}

macro_rules! derive_yaml_read {
    ($Type:ty) => {
        impl YamlRead for $Type {
            // NOTE: Moving this body into a default fn definition on the trait
            //       appears to make codegen lazy for some reason.
            //       Hence we generate these identical bodies in a macro.
            fn from_value(value: serde_yaml::Value) -> Result<$Type, serde_yaml::Error> {
                serde_ignored::deserialize(
                    value,
                    |path| warn!("Unused config item (possible typo?): {}", path),
                )
            }
        }
    };
}

derive_yaml_read!{serde_yaml::Value}

// (this also exists solely for codegen reasons)
fn value_from_dyn_reader(r: &mut dyn Read) -> Result<serde_yaml::Value, serde_yaml::Error>
{ serde_yaml::from_reader(r) }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Number of functions, or `auto` to use the number of fixed states.
    pub nwannier: NWannier,

    /// Lowest bands kept exactly in the subspace.  An integer applies to
    /// every k-point; a list gives one count per k-point.
    #[serde(default)]
    pub fixed_states: Option<FixedStates>,

    /// Fix every band below this energy, measured from the Fermi level for
    /// metals and from the conduction band minimum otherwise.
    ///
    /// Ignored when `fixed-states` is given.
    #[serde(default)]
    pub fixed_energy: Option<f64>,

    /// Only read the lowest bands.  `None` reads all of them.
    #[serde(default)]
    pub nbands: Option<usize>,

    #[serde(default)]
    pub spin: usize,

    #[serde(default)]
    pub functional: Functional,

    #[serde(default)]
    pub initial_guess: InitialGuess,

    /// Seed for the random initial guesses.  `None` draws one from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub localize: LocalizeSettings,

    /// Move every function so that its center lies in this cell.
    #[serde(default)]
    pub translate_to_cell: Option<[i32; 3]>,

    /// Sweep over the number of functions before the final localization.
    #[serde(default)]
    pub optimal_nwannier: Option<OptimalNWannierSettings>,

    /// Write the spectral weight of every function.
    #[serde(default)]
    pub spectral_weight: bool,

    #[serde(default)]
    pub pdos: Option<Pdos>,
}
derive_yaml_read!{Settings}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Pdos {
    pub energies: Energies,
    /// Gaussian broadening.
    #[serde(default = "_pdos__width")]
    pub width: f64,
}
fn _pdos__width() -> f64 { 0.1 }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Energies {
    List(Vec<f64>),
    Range { min: f64, max: f64, step: f64 },
}

impl Energies {
    pub fn to_vec(&self) -> Vec<f64> {
        match *self {
            Energies::List(ref list) => list.clone(),
            Energies::Range { min, max, step } => {
                if !(step > 0.0 && max >= min) {
                    return vec![];
                }
                let count = ((max - min) / step + 1e-9).floor() as usize + 1;
                (0..count).map(|i| min + i as f64 * step).collect()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let settings = Settings::from_reader("nwannier: 4".as_bytes()).unwrap();
        assert_eq!(settings.nwannier, NWannier::Count(4));
        assert_eq!(settings.fixed_states, None);
        assert_eq!(settings.functional, Functional::Std);
        assert_eq!(settings.initial_guess, InitialGuess::Random);
        assert_eq!(settings.localize, LocalizeSettings::default());
        assert!(!settings.spectral_weight);
    }

    #[test]
    fn full_config() {
        let yaml = "
nwannier: auto
fixed-energy: 1.5
spin: 0
functional: var
initial-guess: scdm
seed: 7
localize:
  method: steepest-descent
  step: 0.1
  max-iterations: 500
  update-coefficients: false
  stop-condition:
    rel-change: 1.0e-10
translate-to-cell: [0, 0, 0]
optimal-nwannier:
  nwrange: 3
spectral-weight: true
pdos:
  energies: {min: -1.0, max: 1.0, step: 0.5}
";
        let settings = Settings::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(settings.nwannier, NWannier::Auto);
        assert_eq!(settings.functional, Functional::Var);
        assert_eq!(settings.initial_guess, InitialGuess::Scdm);
        assert_eq!(settings.localize.minimizer.max_iterations, Some(500));
        assert!(!settings.localize.update_coefficients);
        assert!(settings.localize.update_rotations);
        assert_eq!(settings.translate_to_cell, Some([0, 0, 0]));

        let sweep = settings.optimal_nwannier.clone().unwrap();
        assert_eq!(sweep.nwrange, 3);
        assert_eq!(sweep.random_reps, 5);

        let pdos = settings.pdos.clone().unwrap();
        assert_eq!(pdos.energies.to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(pdos.width, 0.1);
    }

    #[test]
    fn fixed_states_forms() {
        let settings = Settings::from_reader("{nwannier: 2, fixed-states: [1, 2]}".as_bytes()).unwrap();
        assert_eq!(settings.fixed_states, Some(FixedStates::PerKpoint(vec![1, 2])));
        let settings = Settings::from_reader("{nwannier: 2, fixed-states: 1}".as_bytes()).unwrap();
        assert_eq!(settings.fixed_states, Some(FixedStates::Uniform(1)));
    }

    #[test]
    fn unknown_keys_are_not_fatal() {
        let settings = Settings::from_reader("{nwannier: 2, nwanier: 3}".as_bytes()).unwrap();
        assert_eq!(settings.nwannier, NWannier::Count(2));
    }
}
