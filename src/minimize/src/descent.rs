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

//! Steepest descent and a damped molecular-dynamics minimizer.
//!
//! Both drivers share the same acceptance rule: a step that raises the objective is
//! undone, the step size is halved and any accumulated velocity is discarded.
//! Accepted iterates are therefore monotonically non-increasing.

use crate::c64;
use crate::stop_condition::{Objectives, ShouldStop, StopCondition};
use ndarray::Array1;

/// Something that can be minimized by the drivers in this module.
///
/// The objective owns its current position.  Implementations are cloned to
/// remember the last accepted position, so cloning should be reasonably cheap.
pub trait Objective: Clone {
    /// The value being minimized.
    fn value(&self) -> f64;

    /// Gradient of `value` with respect to the coordinates that `step` moves along.
    ///
    /// Inner products between gradients and steps are `Re(Σ conj(g_i) dx_i)`.
    fn gradient(&self) -> Array1<c64>;

    /// Move to `x - dx`.
    ///
    /// To first order, this changes the value by `-Re(Σ conj(g_i) dx_i)`.
    fn step(&mut self, dx: &Array1<c64>);
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Step along the negative gradient.
    SteepestDescent,
    /// Treat the negative gradient as a force on a unit mass, zeroing any velocity
    /// component that points uphill.
    MdMin,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default = "_settings__method")]
    pub method: Method,

    /// Initial step size.  It is halved each time a step is rejected.
    #[serde(default = "_settings__step")]
    pub step: f64,

    #[serde(default = "_settings__stop_condition")]
    pub stop_condition: StopCondition,

    /// Cap on attempted steps.  Reaching it is reported, not treated as an error.
    #[serde(default)]
    pub max_iterations: Option<u64>,
}
fn _settings__method() -> Method { Method::MdMin }
fn _settings__step() -> f64 { 0.25 }
fn _settings__stop_condition() -> StopCondition { StopCondition::rel_change(1e-8) }

impl Default for Settings {
    fn default() -> Self {
        Settings {
            method: _settings__method(),
            step: _settings__step(),
            stop_condition: _settings__stop_condition(),
            max_iterations: None,
        }
    }
}

impl Settings {
    /// Default settings, stopping on a relative change in value below `tolerance`.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Settings { stop_condition: StopCondition::rel_change(tolerance), ..Default::default() }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// The stop condition was satisfied, or the step size shrank to nothing.
    Converged,
    /// `max_iterations` steps were attempted first.
    IterationLimit,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone)]
pub struct Output {
    /// Number of attempted steps, including rejected ones.
    pub iterations: u64,
    pub value: f64,
    /// Step size at termination.
    pub step: f64,
    pub termination: Termination,
    /// Value of every accepted iterate, beginning with the initial value.
    pub values: Vec<f64>,
    // ensures addition of new fields is backwards compatible
    #[serde(skip)]
    #[allow(non_snake_case)]
    __no_full_destructure: (),
}

impl Output {
    pub fn converged(&self) -> bool { self.termination == Termination::Converged }
}

/// Minimize `objective` in place.
pub fn minimize<O: Objective>(settings: &Settings, objective: &mut O) -> Output {
    let method = settings.method;
    descend(settings, objective, move |velocity, gradient, alpha| match method {
        Method::SteepestDescent => gradient.mapv(|g| alpha * g),
        Method::MdMin => {
            let mut velocity = velocity.unwrap_or_else(|| Array1::zeros(gradient.len()));
            velocity.zip_mut_with(gradient, |v, &g| {
                if (g * v.conj()).re <= 0.0 {
                    *v = c64::new(0.0, 0.0);
                }
            });
            velocity.zip_mut_with(gradient, |v, &g| *v += alpha * g);
            velocity
        },
    })
}

/// Steepest descent with a fixed (but adaptively halved) step.
pub fn steepest_descent<O: Objective>(objective: &mut O, step: f64, tolerance: f64) -> Output {
    let settings = Settings {
        method: Method::SteepestDescent,
        step,
        ..Settings::with_tolerance(tolerance)
    };
    minimize(&settings, objective)
}

/// Damped molecular-dynamics minimization.
pub fn md_min<O: Objective>(objective: &mut O, step: f64, tolerance: f64) -> Output {
    let settings = Settings {
        method: Method::MdMin,
        step,
        ..Settings::with_tolerance(tolerance)
    };
    minimize(&settings, objective)
}

// `next_step(previous_step, gradient, alpha)` produces the `dx` handed to `Objective::step`.
// `previous_step` is `None` at the start and after every rejected step.
fn descend<O, F>(settings: &Settings, objective: &mut O, mut next_step: F) -> Output
where
    O: Objective,
    F: FnMut(Option<Array1<c64>>, &Array1<c64>, f64) -> Array1<c64>,
{
    let initial_step = settings.step;
    let mut alpha = initial_step;
    let mut value = objective.value();
    let mut gradient = objective.gradient();
    let mut previous_step = None;
    let mut values = vec![value];
    let mut fresh = true;

    let finish = |iterations, value, alpha, termination, values| Output {
        iterations, value, termination, values,
        step: alpha,
        __no_full_destructure: (),
    };

// /////////////////////////////////////////////////////////////////////////////
// Loop start                                                                 //
// /////////////////////////////////////////////////////////////////////////////

    // deliberately spelt plural as it counts how many have elapsed
    for iterations in 0.. {

// /////////////////////////////////////////////////////////////////////////////
// Evaluate exit conditions                                                   //
// /////////////////////////////////////////////////////////////////////////////

        if fresh {
            let grad_norm = gradient.iter().map(|g| g.norm_sqr()).sum::<f64>().sqrt();
            let objectives = Objectives {
                values: &values,
                grad_max: gradient.iter().map(|g| g.norm()).fold(0.0, f64::max),
                grad_norm,
                grad_rms: grad_norm / (gradient.len().max(1) as f64).sqrt(),
                iterations,
            };
            trace!("iter {:>5}: value {:.10e}, |grad| {:.3e}, step {:.3e}", iterations, value, grad_norm, alpha);

            if settings.stop_condition.should_stop(&objectives) {
                debug!("Converged after {} iterations (value: {:.10e})", iterations, value);
                return finish(iterations, value, alpha, Termination::Converged, values);
            }
        }

        if let Some(max) = settings.max_iterations {
            if iterations >= max {
                warn!("Did not converge within {} iterations (value: {:.10e})", max, value);
                return finish(iterations, value, alpha, Termination::IterationLimit, values);
            }
        }

        if alpha < f64::EPSILON * initial_step {
            warn!("Step size underflowed after {} iterations; treating as converged", iterations);
            return finish(iterations, value, alpha, Termination::Converged, values);
        }

// /////////////////////////////////////////////////////////////////////////////
// Take a step                                                                //
// /////////////////////////////////////////////////////////////////////////////

        let dx = next_step(previous_step.take(), &gradient, alpha);
        let saved = objective.clone();
        objective.step(&dx);
        let new_value = objective.value();

        if new_value > value {
            trace!("rejected step (value {:.10e} > {:.10e}); halving step size", new_value, value);
            *objective = saved;
            alpha *= 0.5;
            fresh = false;
        } else {
            value = new_value;
            gradient = objective.gradient();
            values.push(value);
            previous_step = Some(dx);
            fresh = true;
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_functions::Paraboloid;

    #[test]
    fn steepest_descent_paraboloid() {
        let mut func = Paraboloid::new(&[10.0, 10.0, 10.0], 1.0);
        let output = steepest_descent(&mut func, 0.1, 1e-6);
        assert!(output.converged());
        assert_close!(abs=1e-5, func.value(), 1.0);
        assert_eq!(output.value, func.value());
    }

    #[test]
    fn md_min_paraboloid() {
        let mut func = Paraboloid::new(&[10.0, 10.0, 10.0], 1.0);
        let output = md_min(&mut func, 0.1, 1e-8);
        assert!(output.converged());
        assert_close!(abs=1e-5, func.value(), 1.0);
    }

    #[test]
    fn accepted_values_never_increase() {
        // a step this large overshoots, so some steps must be rejected
        for &method in &[Method::SteepestDescent, Method::MdMin] {
            let mut func = Paraboloid::new(&[3.0, -4.0, 0.5, 7.0], 2.0);
            let settings = Settings { method, step: 3.0, ..Settings::with_tolerance(1e-10) };
            let output = minimize(&settings, &mut func);

            assert!(output.values.windows(2).all(|w| w[1] <= w[0]));
            assert!(output.iterations as usize + 1 > output.values.len());
            assert_close!(abs=1e-6, func.value(), 2.0);
        }
    }

    #[test]
    fn iteration_limit_is_not_an_error() {
        let mut func = Paraboloid::new(&[10.0, 10.0, 10.0], 1.0);
        let settings: Settings = from_json!({
            "method": "steepest-descent",
            "step": 0.01,
            "max-iterations": 5,
            "stop-condition": {"rel-change": 1e-12},
        });
        let output = minimize(&settings, &mut func);
        assert_eq!(output.termination, Termination::IterationLimit);
        assert_eq!(output.iterations, 5);
        assert!(func.value() < 301.0);
    }

    // Test that tolerance tests can succeed as early as they ought to be capable of,
    //  by using absurdly large tolerances.
    #[test]
    fn insta_finish() {
        let mut func = Paraboloid::new(&[10.0, 10.0, 10.0], 1.0);
        let settings: Settings = from_json!({"stop-condition": {"grad-max": 1e20}});
        assert_eq!(minimize(&settings, &mut func).iterations, 0);

        // rel-change can only be tested after at least one step
        let settings: Settings = from_json!({"stop-condition": {"rel-change": 1e20}});
        assert_eq!(minimize(&settings, &mut func).iterations, 1);
    }

    #[test]
    fn default_settings_deserialize() {
        let settings: Settings = from_json!({});
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.method, Method::MdMin);
    }
}
