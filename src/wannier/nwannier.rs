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

//! Choosing how many functions to build and which bands to freeze.

use crate::{Error, Result};
use crate::functional::Functional;
use crate::gauge::Subspace;
use crate::initial::InitialGuess;
use crate::problem::Problem;
use crate::source::BlochSource;
use crate::wannier::{LocalizeSettings, Wannier};

use rand::Rng;

/// A number of functions, or `auto` to take the number of fixed states.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(from = "NWannierRepr", into = "NWannierRepr")]
pub enum NWannier {
    Count(usize),
    Auto,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone)]
#[serde(untagged)]
enum NWannierRepr {
    Count(usize),
    Keyword(Keyword),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone)]
#[serde(rename_all = "kebab-case")]
enum Keyword { Auto }

impl From<NWannierRepr> for NWannier {
    fn from(repr: NWannierRepr) -> Self {
        match repr {
            NWannierRepr::Count(n) => NWannier::Count(n),
            NWannierRepr::Keyword(Keyword::Auto) => NWannier::Auto,
        }
    }
}

impl From<NWannier> for NWannierRepr {
    fn from(n: NWannier) -> Self {
        match n {
            NWannier::Count(n) => NWannierRepr::Count(n),
            NWannier::Auto => NWannierRepr::Keyword(Keyword::Auto),
        }
    }
}

/// The number of bands frozen at each k-point.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FixedStates {
    Uniform(usize),
    PerKpoint(Vec<usize>),
}

/// Whether some band crosses the Fermi level.
pub fn is_metal(problem: &Problem) -> bool {
    let fermi = problem.fermi_level();
    (0..problem.nbands()).any(|n| {
        let energies = (0..problem.nkpts()).map(|k| problem.eigenvalues(k)[n]);
        let (lo, hi) = energies.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| (lo.min(e), hi.max(e)));
        lo < fermi && fermi < hi
    })
}

/// The lowest band energy above the Fermi level, if any.
pub fn conduction_band_minimum(problem: &Problem) -> Option<f64> {
    let fermi = problem.fermi_level();
    (0..problem.nkpts())
        .flat_map(|k| problem.eigenvalues(k).iter().cloned().collect::<Vec<_>>())
        .filter(|&e| e > fermi)
        .fold(None, |min: Option<f64>, e| Some(min.map_or(e, |m| m.min(e))))
}

/// Work out the subspace from the user's choices.
///
/// * Explicit `fixed_states` are used as given.
/// * Otherwise, with `fixed_energy` (or with `nwannier: auto`, where it defaults
///   to 0), every band below `reference + fixed_energy` is fixed.  The reference
///   is the Fermi level for metals or for energies below 0.01, and the conduction
///   band minimum otherwise.
/// * Otherwise all `nwannier` states are fixed.
///
/// `auto` takes the largest number of fixed states over the k-points.
pub fn resolve_subspace(
    problem: &Problem,
    nwannier: NWannier,
    fixed_states: Option<&FixedStates>,
    fixed_energy: Option<f64>,
) -> Result<Subspace> {
    let nkpts = problem.nkpts();
    let fixed = match (fixed_states, fixed_energy, nwannier) {
        (Some(FixedStates::Uniform(n)), _, _) => vec![*n; nkpts],
        (Some(FixedStates::PerKpoint(list)), _, _) => list.clone(),
        (None, Some(_), _) | (None, None, NWannier::Auto) => {
            let energy = fixed_energy.unwrap_or(0.0);
            let reference = match is_metal(problem) || energy < 0.01 {
                true => problem.fermi_level(),
                false => conduction_band_minimum(problem).unwrap_or_else(|| problem.fermi_level()),
            };
            let cutoff = reference + energy;
            debug!("fixing all states below {}", cutoff);
            (0..nkpts)
                .map(|k| problem.eigenvalues(k).iter().filter(|&&e| e < cutoff).count())
                .collect()
        },
        (None, None, NWannier::Count(n)) => vec![n; nkpts],
    };

    let nwannier = match nwannier {
        NWannier::Count(n) => n,
        NWannier::Auto => fixed.iter().cloned().max().unwrap_or(0),
    };
    if nwannier == 0 {
        return Err(Error::Unsupported("no states selected (nwannier = 0)".into()));
    }

    let subspace = Subspace { nwannier, fixed_states: fixed };
    subspace.check(problem.nbands(), nkpts)?;
    Ok(subspace)
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OptimalNWannierSettings {
    /// How many candidates to try, centered on the current number.
    #[serde(default = "_optimal_nwannier_settings__nwrange")]
    pub nwrange: usize,
    /// Repetitions for stochastic initial guesses.
    #[serde(default = "_optimal_nwannier_settings__random_reps")]
    pub random_reps: usize,
    #[serde(default = "_optimal_nwannier_settings__tolerance")]
    pub tolerance: f64,
}
fn _optimal_nwannier_settings__nwrange() -> usize { 5 }
fn _optimal_nwannier_settings__random_reps() -> usize { 5 }
fn _optimal_nwannier_settings__tolerance() -> f64 { 1e-6 }

impl Default for OptimalNWannierSettings {
    fn default() -> Self {
        OptimalNWannierSettings {
            nwrange: _optimal_nwannier_settings__nwrange(),
            random_reps: _optimal_nwannier_settings__random_reps(),
            tolerance: _optimal_nwannier_settings__tolerance(),
        }
    }
}

/// Result of [`optimal_nwannier`].
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct OptimalNWannier {
    pub nwannier: usize,
    /// Each candidate with its largest spread, averaged over repetitions.
    pub candidates: Vec<(usize, f64)>,
}

/// Try several numbers of functions near `subspace.nwannier` and pick the one
/// whose largest spread is smallest.
///
/// Candidates range upward from `nwannier - nwrange / 2`, never below the number
/// of fixed states nor above the number of bands.  Every candidate is localized
/// from a fresh initial guess.
pub fn optimal_nwannier<R>(
    problem: &Problem,
    source: Option<&dyn BlochSource>,
    subspace: &Subspace,
    functional: Functional,
    guess: InitialGuess,
    settings: &OptimalNWannierSettings,
    rng: &mut R,
) -> Result<OptimalNWannier>
where R: Rng + ?Sized,
{
    let max_fixed = subspace.fixed_states.iter().cloned().max().unwrap_or(0);
    let min = usize::max(subspace.nwannier.saturating_sub(settings.nwrange / 2), max_fixed).max(1);
    let max = usize::min(min + settings.nwrange, problem.nbands() + 1);
    let reps = match guess.is_stochastic() {
        true => settings.random_reps.max(1),
        false => 1,
    };
    let localize_settings = LocalizeSettings::with_tolerance(settings.tolerance);

    let mut candidates = vec![];
    for nwannier in min..max {
        let fixed_states = subspace.fixed_states.iter().map(|&m| m.min(nwannier)).collect();
        let candidate = Subspace { nwannier, fixed_states };

        let mut total = 0.0;
        for _ in 0..reps {
            let mut wan = Wannier::initialize(problem, candidate.clone(), functional, guess, source, rng)?;
            wan.localize(&localize_settings);
            total += wan.spreads().into_iter().fold(f64::NEG_INFINITY, f64::max);
        }
        let average = total / reps as f64;
        info!("nwannier = {}: average largest spread {:.6}", nwannier, average);
        candidates.push((nwannier, average));
    }

    let best = candidates.iter()
        .fold(None, |best: Option<(usize, f64)>, &(n, spread)| match best {
            Some((_, b)) if b <= spread => best,
            _ => Some((n, spread)),
        })
        .ok_or_else(|| Error::Unsupported(format!("no candidates between {} and {}", min, max)))?;
    Ok(OptimalNWannier { nwannier: best.0, candidates })
}
