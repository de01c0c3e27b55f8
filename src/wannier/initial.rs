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

//! Starting gauges.

use crate::{c64, Error, Result};
use crate::gauge::{Gauge, Subspace};
use crate::kpoints::search_for_gamma_point;
use crate::orbitals::init_orbitals;
use crate::problem::Problem;
use crate::source::BlochSource;

use mlwf_linalg::{dagger, eigh, lowdin, normalize, DegenerateMatrixError};
use ndarray::{s, Array2, Axis};
use rand::Rng;

/// Eigenvalues of `proj† proj` below this leave a disentangled direction undetermined.
const PROJECTION_TOL: f64 = 1e-12;

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InitialGuess {
    /// The lowest Bloch states, unrotated.
    Bloch,
    /// Haar-random rotations and coefficients.
    Random,
    /// Projections onto Gaussian trial orbitals near the atoms.
    Orbitals,
    /// Selected columns of the density matrix at Gamma.
    Scdm,
}

impl Default for InitialGuess {
    fn default() -> Self { InitialGuess::Random }
}

impl InitialGuess {
    /// Whether repeated calls can give different gauges.
    pub fn is_stochastic(self) -> bool {
        match self {
            InitialGuess::Random | InitialGuess::Orbitals => true,
            InitialGuess::Bloch | InitialGuess::Scdm => false,
        }
    }

    /// Whether the guess reads wavefunctions from the Bloch source.
    pub fn needs_source(self) -> bool {
        match self {
            InitialGuess::Orbitals | InitialGuess::Scdm => true,
            InitialGuess::Bloch | InitialGuess::Random => false,
        }
    }
}

/// Build a starting gauge for a problem.
///
/// `source` must be the data the problem was built from; it is only consulted by
/// the guesses that need wavefunctions.
pub fn initial_gauge<R>(
    guess: InitialGuess,
    problem: &Problem,
    subspace: &Subspace,
    source: Option<&dyn BlochSource>,
    rng: &mut R,
) -> Result<Gauge>
where R: Rng + ?Sized,
{
    subspace.check(problem.nbands(), problem.nkpts())?;
    let nbands = problem.nbands();
    let spin = problem.spin();

    info!("Initial guess: {:?}", guess);
    match (guess, source) {
        (InitialGuess::Bloch, _) => Ok(Gauge::bloch(subspace, nbands)),
        (InitialGuess::Random, _) => Ok(Gauge::random(subspace, nbands, rng)),
        (InitialGuess::Orbitals, Some(source)) => {
            let cell = problem.mesh().cell;
            let shells = init_orbitals(problem.atoms(), &cell, subspace.nwannier, rng)?;

            let mut gauge = Gauge { rotations: vec![], coefficients: vec![] };
            for (k, &fixed) in subspace.fixed_states.iter().enumerate() {
                let proj = source.projections(&shells, k, spin, nbands)?;
                let (u, c) = rotation_from_projection(&proj, fixed, true)?;
                gauge.rotations.push(u);
                gauge.coefficients.push(c);
            }
            Ok(gauge)
        },
        (InitialGuess::Scdm, Some(source)) => scdm(source, problem, subspace),
        (InitialGuess::Orbitals, None) |
        (InitialGuess::Scdm, None) => {
            Err(Error::Unsupported(format!("the {:?} initial guess needs wavefunctions", guess)))
        },
    }
}

/// Turn the projections `proj_nw` of `nbands` Bloch states onto `nwannier` trial
/// functions into a rotation `U` and coefficients `C`.
///
/// The first `fixed` rows of `U` are the projections of the fixed states.  `C`
/// spans the `nwannier - fixed` directions of the remaining bands that carry the
/// most weight of the trial functions, and the rest of `U` is the projection onto
/// those directions.  With `ortho`, `U` is then made unitary by Löwdin
/// orthonormalization; otherwise its columns are only normalized.
pub fn rotation_from_projection(
    proj: &Array2<c64>,
    fixed: usize,
    ortho: bool,
) -> Result<(Array2<c64>, Array2<c64>)> {
    let (nbands, nw) = proj.dim();
    if fixed > nw || nw > nbands {
        return Err(Error::ShapeMismatch(format!(
            "cannot fix {} of {} functions with {} bands", fixed, nw, nbands,
        )));
    }
    let extra = nw - fixed;

    let mut u = Array2::zeros((nw, nw));
    u.slice_mut(s![..fixed, ..]).assign(&proj.slice(s![..fixed, ..]));

    let mut c = Array2::zeros((nbands - fixed, extra));
    if extra > 0 {
        let proj_rest = proj.slice(s![fixed.., ..]).to_owned();
        let (values, vectors) = eigh(&dagger(&proj_rest).dot(&proj_rest));

        // largest eigenvalues last
        let top: Vec<usize> = (0..nw).rev().take(extra).collect();
        if top.iter().any(|&i| values[i] <= PROJECTION_TOL) {
            return Err(DegenerateMatrixError.into());
        }
        c = proj_rest.dot(&vectors.select(Axis(1), &top));
        normalize(c.view_mut());
        u.slice_mut(s![fixed.., ..]).assign(&dagger(&c).dot(&proj_rest));
    }

    let u = match ortho {
        true => lowdin(&u)?,
        false => {
            let mut u = u;
            normalize(u.view_mut());
            u
        },
    };
    Ok((u, c))
}

/// Selected columns of the density matrix.
///
/// The grid points chosen by column-pivoted QR of the Gamma-point wavefunctions
/// serve as localized trial functions at every k-point.
pub fn scdm(source: &dyn BlochSource, problem: &Problem, subspace: &Subspace) -> Result<Gauge> {
    let kpts = &problem.mesh().kpts;
    let gamma = search_for_gamma_point(kpts).ok_or(Error::NoGammaPoint)?;
    let nbands = problem.nbands();
    let spin = problem.spin();

    let flatten = |k: usize| -> Array2<c64> {
        let states = source.wavefunctions(k, spin, nbands);
        let npoints = states.first().map_or(0, |psi| psi.len());
        let mut out = Array2::zeros((nbands, npoints));
        for (mut row, psi) in out.rows_mut().into_iter().zip(&states) {
            row.iter_mut().zip(psi.iter()).for_each(|(r, &x)| *r = x);
        }
        out
    };

    let points = mlwf_linalg::pivoted_columns(flatten(gamma).view(), subspace.nwannier)?;
    debug!("SCDM selected grid points {:?}", points);

    let mut gauge = Gauge { rotations: vec![], coefficients: vec![] };
    for (k, &fixed) in subspace.fixed_states.iter().enumerate() {
        // <psi_nk | delta(r - r_w)>
        let proj = flatten(k).select(Axis(1), &points).mapv(|x| x.conj());
        let (u, c) = rotation_from_projection(&proj, fixed, true)?;
        gauge.rotations.push(u);
        gauge.coefficients.push(c);
    }
    Ok(gauge)
}
