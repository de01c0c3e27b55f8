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

//! All of the checks that occur after the config is read are written here.

use crate::{Energies, FixedStates, NWannier, Settings};
use failure::Error;
use std::ops::Deref;

/// Upper limit on the number of energies in a `pdos` range.
const MAX_PDOS_POINTS: f64 = 1e6;

/// Settings that passed [`Settings::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(Settings);

impl Deref for ValidatedSettings {
    type Target = Settings;

    fn deref(&self) -> &Settings { &self.0 }
}

impl Settings {
    pub fn validate(self) -> Result<ValidatedSettings, Error> {
        check_counts(&self)?;
        check_localize(&self)?;

        if let Some(sweep) = &self.optimal_nwannier {
            if sweep.nwrange == 0 {
                bail!("`optimal-nwannier.nwrange` must be at least 1");
            }
            if !(sweep.tolerance > 0.0) {
                bail!("`optimal-nwannier.tolerance` must be positive (got {})", sweep.tolerance);
            }
        }

        if let Some(pdos) = &self.pdos {
            if !(pdos.width > 0.0) {
                bail!("`pdos.width` must be positive (got {})", pdos.width);
            }
            if let Energies::Range { min, max, step } = pdos.energies {
                if !(step > 0.0 && step.is_finite()) {
                    bail!("`pdos.energies.step` must be positive (got {})", step);
                }
                if !(min.is_finite() && max.is_finite() && max >= min) {
                    bail!("`pdos.energies` needs finite `min <= max` (got {} and {})", min, max);
                }
                if (max - min) / step >= MAX_PDOS_POINTS {
                    bail!("`pdos.energies` would have more than {} points", MAX_PDOS_POINTS);
                }
            }
            if pdos.energies.to_vec().is_empty() {
                bail!("`pdos.energies` is empty");
            }
        }

        Ok(ValidatedSettings(self))
    }
}

fn check_counts(settings: &Settings) -> Result<(), Error> {
    let max_fixed = match &settings.fixed_states {
        None => None,
        Some(FixedStates::Uniform(m)) => Some(*m),
        Some(FixedStates::PerKpoint(list)) => {
            if list.is_empty() {
                bail!("`fixed-states` is an empty list");
            }
            list.iter().cloned().max()
        },
    };

    if let NWannier::Count(n) = settings.nwannier {
        if n == 0 {
            bail!("`nwannier` must be positive");
        }
        if let Some(m) = max_fixed {
            if m > n {
                bail!("`fixed-states` ({}) exceeds `nwannier` ({})", m, n);
            }
        }
    }

    if let (Some(nbands), Some(m)) = (settings.nbands, max_fixed) {
        if m > nbands {
            bail!("`fixed-states` ({}) exceeds `nbands` ({})", m, nbands);
        }
    }
    if let (Some(nbands), NWannier::Count(n)) = (settings.nbands, settings.nwannier) {
        if n > nbands {
            bail!("`nwannier` ({}) exceeds `nbands` ({})", n, nbands);
        }
    }

    if settings.fixed_states.is_some() && settings.fixed_energy.is_some() {
        warn!("Both `fixed-states` and `fixed-energy` were given; `fixed-energy` will be ignored.");
    }
    if let (NWannier::Auto, Some(_)) = (settings.nwannier, &settings.optimal_nwannier) {
        warn!("`optimal-nwannier` will search around the automatically chosen `nwannier`.");
    }
    Ok(())
}

fn check_localize(settings: &Settings) -> Result<(), Error> {
    let step = settings.localize.minimizer.step;
    if !(step > 0.0 && step.is_finite()) {
        bail!("`localize.step` must be positive (got {})", step);
    }
    if !settings.localize.update_rotations && !settings.localize.update_coefficients {
        warn!("`localize` will not update anything; the initial guess is the result.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Settings, YamlRead};

    fn validate(yaml: &str) -> Result<(), String> {
        Settings::from_reader(yaml.as_bytes()).unwrap()
            .validate()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    #[test]
    fn accepts_reasonable_settings() {
        validate("{nwannier: 2}").unwrap();
        validate("{nwannier: auto, fixed-energy: 0.5}").unwrap();
        validate("{nwannier: 3, fixed-states: [1, 3], nbands: 4}").unwrap();
    }

    #[test]
    fn rejects_inconsistent_counts() {
        assert!(validate("{nwannier: 0}").unwrap_err().contains("nwannier"));
        assert!(validate("{nwannier: 2, fixed-states: 3}").unwrap_err().contains("fixed-states"));
        assert!(validate("{nwannier: 2, fixed-states: []}").is_err());
        assert!(validate("{nwannier: 5, nbands: 4}").unwrap_err().contains("nbands"));
        assert!(validate("{nwannier: auto, fixed-states: 5, nbands: 4}").is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(validate("{nwannier: 2, localize: {step: 0.0}}").unwrap_err().contains("step"));
        assert!(validate("{nwannier: 2, localize: {step: -1.0}}").is_err());
        assert!(validate("{nwannier: 2, pdos: {energies: [0.0], width: 0.0}}").unwrap_err().contains("width"));
        assert!(validate("{nwannier: 2, pdos: {energies: []}}").is_err());
        assert!(validate("{nwannier: 2, pdos: {energies: {min: 0.0, max: 1.0, step: 0.0}}}").unwrap_err().contains("step"));
        assert!(validate("{nwannier: 2, pdos: {energies: {min: 0.0, max: 1.0, step: -0.1}}}").is_err());
        assert!(validate("{nwannier: 2, pdos: {energies: {min: 0.0, max: 1.0, step: 1.0e-12}}}").unwrap_err().contains("points"));
        assert!(validate("{nwannier: 2, pdos: {energies: {min: 1.0, max: 0.0, step: 0.1}}}").unwrap_err().contains("min"));
        validate("{nwannier: 2, pdos: {energies: {min: -1.0, max: 1.0, step: 0.5}}}").unwrap();
        assert!(validate("{nwannier: 2, optimal-nwannier: {nwrange: 0}}").is_err());
    }
}
