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

//! Exposes a serializable expression language for algorithmic stop conditions.

/// Generic trait for stop conditions.
pub trait ShouldStop<T> {
    fn should_stop(&self, x: &T) -> bool;
}

/// Represents logical expressions of T in JSON.
///
/// Where `(T)` stands in for a valid JSON representation of `T`,
/// the accepted forms of `LogicalExpressions<T>` are as follows:
///
///  - `{'any': [(T), ...]}` - a logical-or of 0 or more expressions
///  - `{'all': [(T), ...]}` - a logical-and of 0 or more expressions
///
/// This is used through the `Cereal` type, where these variants appear
/// untagged alongside valid representations of `T`.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub enum LogicalExpression<T> {
    #[serde(rename = "any")]
    Any(Vec<T>),
    #[serde(rename = "all")]
    All(Vec<T>),
}

/// Type that stop condition config can deserialize directly into.
///
/// This extends a simple predicate type (represented as an object
/// with a single kv pair) with 'all' and 'any' variants.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cereal<P> {
    Simple(P),
    Logical(LogicalExpression<Cereal<P>>),
}

impl<T, P> ShouldStop<T> for Cereal<P>
where P: ShouldStop<T>,
{
    fn should_stop(&self, x: &T) -> bool {
        match self {
            Cereal::Simple(pred) => pred.should_stop(x),
            Cereal::Logical(LogicalExpression::Any(xs)) => xs.iter().any(|c| c.should_stop(x)),
            Cereal::Logical(LogicalExpression::All(xs)) => xs.iter().all(|c| c.should_stop(x)),
        }
    }
}

/// Quantities that stop conditions may inspect, gathered after each accepted step.
#[derive(Debug, Clone, PartialEq)]
pub struct Objectives<'a> {
    /// Objective values of all accepted iterates, oldest first.
    pub values: &'a [f64],
    pub grad_max: f64,
    pub grad_norm: f64,
    pub grad_rms: f64,
    /// Number of attempted steps, including rejected ones.
    pub iterations: u64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Simple {
    /// Stop once `|f_new - f_old| <= tol * |f_new|` for the two most recent accepted values.
    #[serde(rename =  "rel-change")] RelChange(f64),
    /// This compares signed values, not magnitudes.
    ///
    /// What this means is that:
    /// - positive threshold says "stop if value increases more than this"
    /// - negative threshold says "continue as long as value has decreased
    ///                             by at least this much"
    #[serde(rename = "value-delta")] ValueDelta {
        #[serde(rename = "rel-greater-than")] delta: f64,
        #[serde(rename =        "steps-ago")] steps_ago: u32,
    },
    /// Max absolute value of grad.
    #[serde(rename =    "grad-max")] GradientMax(f64),
    /// Norm of grad.
    /// (Beware, this scales with sqrt(N)...)
    #[serde(rename =   "grad-norm")] GradientNorm(f64),
    /// Norm of grad, rescaled as an intensive property.
    #[serde(rename =    "grad-rms")] GradientRms(f64),
    /// The number of attempted steps.
    #[serde(rename =  "iterations")] Iterations(u64),
}

// Relative difference.
//
// This won't return NaN for finite inputs, although it
// WILL be infinite if exactly one of the two operands is zero
fn rel_sub(a: f64, b: f64) -> f64 {
    if a == b { return 0.0; }
    (a - b) / a.abs().min(b.abs())
}

impl<'a> ShouldStop<Objectives<'a>> for Simple {
    fn should_stop(&self, objs: &Objectives<'a>) -> bool {
        match *self {
            Simple::RelChange(tol) => match objs.values {
                [.., old, new] => (new - old).abs() <= tol * new.abs(),
                _ => false,
            },
            Simple::ValueDelta { delta: min_change, steps_ago } => {
                let len = objs.values.len();
                match (objs.values.last(), len.checked_sub(steps_ago as usize + 1)) {
                    (Some(&last), Some(i)) => rel_sub(last, objs.values[i]) >= min_change,
                    _ => false,
                }
            },
            Simple::GradientMax(tol) => objs.grad_max <= tol,
            Simple::GradientNorm(tol) => objs.grad_norm <= tol,
            Simple::GradientRms(tol) => objs.grad_rms <= tol,
            Simple::Iterations(n) => objs.iterations >= n,
        }
    }
}

/// Configuration for the built-in stop conditions.
///
/// The recommended method for constructing one of these is to deserialize it from JSON
/// or YAML.  The set of basic conditions is documented in `#[serde]` annotations on
/// [`Simple`], and there are additionally `"all"` and `"any"` meta-conditions.
pub type StopCondition = Cereal<Simple>;

impl StopCondition {
    /// Stop on a relative change of the objective below `tol`.
    pub fn rel_change(tol: f64) -> Self { Cereal::Simple(Simple::RelChange(tol)) }
}
