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

//! Persisting a gauge so that a localization can be resumed or reused.

use crate::{c64, Error, Result};
use crate::functional::Functional;
use crate::gauge::{Gauge, Subspace};
use crate::problem::Problem;
use crate::wannier::Wannier;

use std::path::Path;

use ndarray::Array2;

/// Everything needed to rebuild a [`Wannier`] for the same problem.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SavedGauge {
    pub nwannier: usize,
    pub nbands: usize,
    pub nkpts: usize,
    pub fixed_states: Vec<usize>,
    /// Rotations, one per k-point.
    pub u: Vec<Array2<c64>>,
    /// Disentanglement coefficients, one per k-point.
    pub c: Vec<Array2<c64>>,
}

impl SavedGauge {
    pub fn from_state(wan: &Wannier<'_>) -> SavedGauge {
        let subspace = wan.subspace();
        SavedGauge {
            nwannier: subspace.nwannier,
            nbands: wan.problem().nbands(),
            nkpts: wan.problem().nkpts(),
            fixed_states: subspace.fixed_states.clone(),
            u: wan.gauge().rotations.clone(),
            c: wan.gauge().coefficients.clone(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<SavedGauge> {
        let file = mlwf_fs_util::open_text(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = mlwf_fs_util::create_text(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    /// Check against the problem and split into the subspace and gauge.
    pub fn into_parts(self, problem: &Problem) -> Result<(Subspace, Gauge)> {
        if self.nbands != problem.nbands() || self.nkpts != problem.nkpts() {
            return Err(Error::InvalidSavedGauge(format!(
                "saved for {} bands on {} k-points, but the problem has {} bands on {} k-points",
                self.nbands, self.nkpts, problem.nbands(), problem.nkpts(),
            )));
        }
        let subspace = Subspace { nwannier: self.nwannier, fixed_states: self.fixed_states };
        let gauge = Gauge { rotations: self.u, coefficients: self.c };

        let invalid = |e: Error| Error::InvalidSavedGauge(e.to_string());
        subspace.check(problem.nbands(), problem.nkpts()).map_err(invalid)?;
        gauge.check(&subspace, problem.nbands()).map_err(invalid)?;
        Ok((subspace, gauge))
    }
}

impl<'p> Wannier<'p> {
    /// Write the current gauge as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        SavedGauge::from_state(self).save(path)
    }

    /// Resume from a gauge written by [`Wannier::save`].
    pub fn load<P: AsRef<Path>>(problem: &'p Problem, functional: Functional, path: P) -> Result<Wannier<'p>> {
        let (subspace, gauge) = SavedGauge::load(path)?.into_parts(problem)?;
        Wannier::new(problem, subspace, functional, gauge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initial::InitialGuess;
    use crate::test_util;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn resumes_with_the_same_functional() {
        let data = test_util::disentangle_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let subspace = Subspace { nwannier: 2, fixed_states: vec![1; problem.nkpts()] };
        let mut rng = StdRng::seed_from_u64(61);
        let wan = Wannier::initialize(
            &problem, subspace, Functional::Var, InitialGuess::Random, None, &mut rng,
        ).unwrap();

        let tmp = tempdir::TempDir::new("mlwf-save").unwrap();
        let path = tmp.path().join("gauge.json");
        wan.save(&path).unwrap();

        let loaded = Wannier::load(&problem, Functional::Var, &path).unwrap();
        assert_eq!(loaded.subspace(), wan.subspace());
        assert_close!(rel=1e-12, loaded.functional_value(), wan.functional_value());
        assert_close!(abs=1e-14, loaded.gauge().rotations.clone(), wan.gauge().rotations.clone());
    }

    #[test]
    fn rejects_a_different_problem() {
        let data = test_util::disentangle_model();
        let problem = Problem::new(&data, 0, None).unwrap();
        let smaller = Problem::new(&data, 0, Some(2)).unwrap();
        let wan = Wannier::new(&problem, Subspace::uniform(2, problem.nkpts()), Functional::Std,
            Gauge::bloch(&Subspace::uniform(2, problem.nkpts()), problem.nbands())).unwrap();

        match SavedGauge::from_state(&wan).into_parts(&smaller) {
            Err(Error::InvalidSavedGauge(_)) => {},
            r => panic!("unexpected: {:?}", r),
        }

        let mut broken = SavedGauge::from_state(&wan);
        broken.u.pop();
        match broken.into_parts(&problem) {
            Err(Error::InvalidSavedGauge(_)) => {},
            r => panic!("unexpected: {:?}", r),
        }
    }
}
