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

//! Analytic test functions with known minima.

use crate::c64;
use crate::descent::Objective;
use ndarray::Array1;

/// `f(x) = shift + Σ |x_i|²`, minimized at the origin.
#[derive(Debug, Clone)]
pub struct Paraboloid {
    pos: Array1<c64>,
    shift: f64,
}

impl Paraboloid {
    pub fn new(pos: &[f64], shift: f64) -> Self {
        Paraboloid {
            pos: pos.iter().map(|&x| c64::new(x, 0.0)).collect(),
            shift,
        }
    }
}

impl Objective for Paraboloid {
    fn value(&self) -> f64 {
        self.shift + self.pos.iter().map(|x| x.norm_sqr()).sum::<f64>()
    }

    fn gradient(&self) -> Array1<c64> { self.pos.mapv(|x| 2.0 * x) }

    fn step(&mut self, dx: &Array1<c64>) { self.pos -= dx; }
}
