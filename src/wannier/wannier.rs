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

use crate::{c64, Result};
use crate::functional::{Functional, Rotated};
use crate::gauge::{Gauge, GaugeTangent, Subspace};
use crate::initial::{initial_gauge, InitialGuess};
use crate::problem::Problem;
use crate::source::BlochSource;

use mlwf_minimize::{Objective, Output, Termination};
use ndarray::Array1;
use rand::Rng;

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LocalizeSettings {
    #[serde(flatten)]
    pub minimizer: mlwf_minimize::Settings,

    /// Set to false to hold the rotations `U` fixed.
    #[serde(default = "_localize_settings__update")]
    pub update_rotations: bool,

    /// Set to false to hold the disentanglement coefficients `C` fixed.
    #[serde(default = "_localize_settings__update")]
    pub update_coefficients: bool,
}
fn _localize_settings__update() -> bool { true }

impl Default for LocalizeSettings {
    fn default() -> Self {
        LocalizeSettings {
            minimizer: Default::default(),
            update_rotations: true,
            update_coefficients: true,
        }
    }
}

impl LocalizeSettings {
    pub fn with_tolerance(tolerance: f64) -> Self {
        LocalizeSettings {
            minimizer: mlwf_minimize::Settings::with_tolerance(tolerance),
            ..Default::default()
        }
    }
}

/// Outcome of the most recent localization.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Not localized since the gauge was last set.
    Initialized,
    Converged { iterations: u64 },
    IterationLimit { iterations: u64 },
}

impl Status {
    pub fn is_converged(&self) -> bool {
        match self {
            Status::Converged { .. } => true,
            _ => false,
        }
    }
}

/// A gauge for a problem, together with everything derived from it.
///
/// The problem is borrowed and never modified, so many states can share it.
#[derive(Debug, Clone)]
pub struct Wannier<'p> {
    problem: &'p Problem,
    subspace: Subspace,
    functional: Functional,
    gauge: Gauge,
    rotated: Rotated,
    update_rotations: bool,
    update_coefficients: bool,
    status: Status,
}

impl<'p> Wannier<'p> {
    pub fn new(problem: &'p Problem, subspace: Subspace, functional: Functional, gauge: Gauge) -> Result<Self> {
        subspace.check(problem.nbands(), problem.nkpts())?;
        gauge.check(&subspace, problem.nbands())?;
        let rotated = Rotated::new(problem, &gauge);
        Ok(Wannier {
            problem, subspace, functional, gauge, rotated,
            update_rotations: true,
            update_coefficients: true,
            status: Status::Initialized,
        })
    }

    /// Start from an initial guess.
    pub fn initialize<R>(
        problem: &'p Problem,
        subspace: Subspace,
        functional: Functional,
        guess: InitialGuess,
        source: Option<&dyn BlochSource>,
        rng: &mut R,
    ) -> Result<Self>
    where R: Rng + ?Sized,
    {
        let gauge = initial_gauge(guess, problem, &subspace, source, rng)?;
        Wannier::new(problem, subspace, functional, gauge)
    }

    pub fn problem(&self) -> &'p Problem { self.problem }

    pub fn subspace(&self) -> &Subspace { &self.subspace }

    pub fn functional(&self) -> Functional { self.functional }

    pub fn gauge(&self) -> &Gauge { &self.gauge }

    pub fn status(&self) -> Status { self.status }

    pub fn nwannier(&self) -> usize { self.subspace.nwannier }

    pub(crate) fn rotated(&self) -> &Rotated { &self.rotated }

    pub fn set_gauge(&mut self, gauge: Gauge) -> Result<()> {
        gauge.check(&self.subspace, self.problem.nbands())?;
        self.gauge = gauge;
        self.update();
        self.status = Status::Initialized;
        Ok(())
    }

    /// The localization functional `Ω`, which localization maximizes.
    pub fn functional_value(&self) -> f64 {
        self.functional.value(self.problem, &self.rotated)
    }

    /// The gradient of [`Wannier::functional_value`].
    pub fn functional_gradient(&self) -> GaugeTangent {
        self.functional.gradient(self.problem, &self.subspace, &self.gauge, &self.rotated)
    }

    /// Move the gauge to `(U exp(-dU), GramSchmidt(C - dC))`.
    pub fn step(&mut self, dx: &GaugeTangent) {
        self.gauge.step(dx);
        self.update();
    }

    fn update(&mut self) {
        self.rotated = Rotated::new(self.problem, &self.gauge);
    }

    /// Swap in a gauge of the same shape without resetting the status.
    pub(crate) fn replace_gauge(&mut self, gauge: Gauge) {
        debug_assert!(gauge.check(&self.subspace, self.problem.nbands()).is_ok());
        self.gauge = gauge;
        self.update();
    }

    /// Maximize the functional in place.
    ///
    /// Running out of iterations is not an error; check the returned
    /// termination or [`Wannier::status`].
    pub fn localize(&mut self, settings: &LocalizeSettings) -> Output {
        info!("Localizing {} functions, initial value {:.10}", self.nwannier(), self.functional_value());
        self.update_rotations = settings.update_rotations;
        self.update_coefficients = settings.update_coefficients;

        let output = mlwf_minimize::minimize(&settings.minimizer, self);

        self.update_rotations = true;
        self.update_coefficients = true;
        self.status = match output.termination {
            Termination::Converged => Status::Converged { iterations: output.iterations },
            Termination::IterationLimit => Status::IterationLimit { iterations: output.iterations },
        };
        info!("{:?}, final value {:.10}", self.status, self.functional_value());
        output
    }
}

/// The minimizers see `-Ω`.
impl<'p> Objective for Wannier<'p> {
    fn value(&self) -> f64 { -self.functional_value() }

    fn gradient(&self) -> Array1<c64> {
        let mut grad = self.functional_gradient();
        grad.scale(-1.0);
        if !self.update_rotations {
            grad.rotations.iter_mut().for_each(|g| g.fill(c64::new(0.0, 0.0)));
        }
        if !self.update_coefficients {
            grad.coefficients.iter_mut().for_each(|g| g.fill(c64::new(0.0, 0.0)));
        }
        grad.flatten()
    }

    fn step(&mut self, dx: &Array1<c64>) {
        let dx = GaugeTangent::unflatten(dx, &self.gauge);
        Wannier::step(self, &dx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn localization_is_monotonic() {
        let _ = env_logger::try_init();
        let data = test_util::kmesh_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let subspace = Subspace::uniform(2, problem.nkpts());
        let mut rng = StdRng::seed_from_u64(31);

        for &functional in &[Functional::Std, Functional::Var] {
            let mut wan = Wannier::initialize(
                &problem, subspace.clone(), functional, InitialGuess::Random, None, &mut rng,
            ).unwrap();
            let before = wan.functional_value();
            let output = wan.localize(&LocalizeSettings::with_tolerance(1e-8));
            assert!(output.converged());
            assert!(wan.functional_value() > before);
            for pair in output.values.windows(2) {
                assert!(pair[1] <= pair[0]);
            }
            assert_eq!(wan.status(), Status::Converged { iterations: output.iterations });
        }
    }

    #[test]
    fn objective_step_matches_functional_gradient() {
        // a small step along the objective gradient raises Ω at the predicted rate
        let data = test_util::disentangle_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let subspace = Subspace { nwannier: 2, fixed_states: vec![1; problem.nkpts()] };
        let mut rng = StdRng::seed_from_u64(32);
        let wan = Wannier::initialize(
            &problem, subspace, Functional::Std, InitialGuess::Random, None, &mut rng,
        ).unwrap();

        let g = Objective::gradient(&wan);
        let eps = 1e-6;
        let mut moved = wan.clone();
        Objective::step(&mut moved, &g.mapv(|x| x * eps));
        let predicted = -eps * g.iter().map(|x| x.norm_sqr()).sum::<f64>();
        let actual = Objective::value(&moved) - Objective::value(&wan);
        assert_close!(rel=1e-3, actual, predicted);
    }

    #[test]
    fn frozen_parts_do_not_move() {
        let data = test_util::disentangle_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let subspace = Subspace { nwannier: 2, fixed_states: vec![1; problem.nkpts()] };
        let mut rng = StdRng::seed_from_u64(33);
        let mut wan = Wannier::initialize(
            &problem, subspace, Functional::Std, InitialGuess::Random, None, &mut rng,
        ).unwrap();

        let rotations = wan.gauge().rotations.clone();
        let mut settings = LocalizeSettings::with_tolerance(1e-6);
        settings.update_rotations = false;
        wan.localize(&settings);
        assert_close!(abs=1e-12, wan.gauge().rotations.clone(), rotations);

        let coefficients = wan.gauge().coefficients.clone();
        let mut settings = LocalizeSettings::with_tolerance(1e-6);
        settings.update_coefficients = false;
        wan.localize(&settings);
        assert_close!(abs=1e-12, wan.gauge().coefficients.clone(), coefficients);
    }

    #[test]
    fn iteration_limit_is_reported() {
        let data = test_util::kmesh_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let subspace = Subspace::uniform(2, problem.nkpts());
        let mut rng = StdRng::seed_from_u64(34);
        let mut wan = Wannier::initialize(
            &problem, subspace, Functional::Std, InitialGuess::Random, None, &mut rng,
        ).unwrap();

        let settings: LocalizeSettings = serde_json::from_value(serde_json::json!({
            "max-iterations": 2,
            "stop-condition": {"rel-change": 1e-30},
        })).unwrap();
        assert!(settings.update_rotations);
        let output = wan.localize(&settings);
        assert_eq!(output.termination, Termination::IterationLimit);
        assert_eq!(wan.status(), Status::IterationLimit { iterations: 2 });
    }
}
