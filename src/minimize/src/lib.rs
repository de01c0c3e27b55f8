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

//! Minimizers for objectives whose coordinates live on a manifold.
//!
//! The objective owns its position and decides what "subtracting" a step means,
//! so the same drivers work for flat test functions and for gauge matrices that
//! must stay unitary.

extern crate serde;
#[macro_use] extern crate serde_derive;
#[cfg(test)] #[macro_use] extern crate serde_json;

#[cfg(test)] #[macro_use] extern crate mlwf_assert_close;

#[macro_use] extern crate log;

#[cfg(test)]
macro_rules! from_json {
    ($($arg:tt)*) => { ::serde_json::from_value(json!($($arg)*)).unwrap() };
}

#[cfg(test)] pub(crate) mod test_functions;
pub mod stop_condition;
pub mod descent;

pub use crate::descent::{md_min, minimize, steepest_descent, Method, Objective, Output, Settings, Termination};
pub use crate::stop_condition::StopCondition;

#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex64;
