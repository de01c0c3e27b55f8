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

//! Maximally localized Wannier functions.
//!
//! The data flow is:
//!
//! * A [`BlochSource`] (an electronic structure code, a [`GridData`] file, or the
//!   synthetic [`ModelSystem`]) supplies Bloch states on a k-point mesh.
//! * [`Problem::new`] turns these into immutable problem data: the neighbor graph of
//!   the mesh with its finite-difference weights, and band-space overlap matrices.
//! * A [`Subspace`] says how many functions to build and how many bands are frozen
//!   at each k-point; an [`InitialGuess`] produces the starting [`Gauge`].
//! * [`Wannier`] pairs the problem with a gauge, and is localized by the
//!   minimizers in `mlwf_minimize`.
//! * Centers, spreads, hoppings and real-space functions are derived from the result.

#[macro_use] extern crate log;
#[macro_use] extern crate serde_derive;

#[cfg(test)] #[macro_use] extern crate mlwf_assert_close;

pub mod lattice;
pub mod kpoints;
pub mod source;
pub mod grid;
pub mod orbitals;
pub mod model;
pub mod problem;
pub mod gauge;
pub mod functional;
pub mod initial;
mod wannier;
mod observables;
pub mod nwannier;
mod save;

#[cfg(test)] mod test_util;

pub use crate::functional::Functional;
pub use crate::gauge::{Gauge, Subspace};
pub use crate::initial::{rotation_from_projection, InitialGuess};
pub use crate::kpoints::{calculate_weights, neighbor_k_search, search_for_gamma_point, Mesh};
pub use crate::model::{ModelSite, ModelSystem};
pub use crate::nwannier::{optimal_nwannier, resolve_subspace, FixedStates, NWannier, OptimalNWannier, OptimalNWannierSettings};
pub use crate::observables::Combination;
pub use crate::orbitals::{init_orbitals, OrbitalShell};
pub use crate::problem::Problem;
pub use crate::save::SavedGauge;
pub use crate::source::{Atoms, BlochSource, GridData};
pub use crate::wannier::{LocalizeSettings, Status, Wannier};

pub use mlwf_linalg::c64;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ---- problems with the input data ----
    #[error("k-point {kpt} has no neighbor along {direction:?}; the mesh is not periodic")]
    NonPeriodicMesh { kpt: usize, direction: [i32; 3] },

    #[error("k-points do not form a regular mesh: {0}")]
    IrregularMesh(String),

    #[error("inconsistent input data: {0}")]
    ShapeMismatch(String),

    #[error("projection onto the trial functions is degenerate")]
    DegenerateProjection(#[from] mlwf_linalg::DegenerateMatrixError),

    #[error("the k-point mesh does not contain the Gamma point")]
    NoGammaPoint,

    #[error("saved gauge does not match this problem: {0}")]
    InvalidSavedGauge(String),

    // ---- requests that cannot be satisfied ----
    #[error("{fixed} fixed states at k-point {kpt} exceed nwannier = {nwannier}")]
    TooManyFixedStates { kpt: usize, fixed: usize, nwannier: usize },

    #[error("nwannier = {nwannier} exceeds the number of bands ({nbands})")]
    NotEnoughBands { nwannier: usize, nbands: usize },

    #[error("could not place {count} trial orbitals near the atoms after {attempts} attempts")]
    OrbitalPlacement { count: usize, attempts: usize },

    #[error("unsupported: {0}")]
    Unsupported(String),

    // ---- plumbing ----
    #[error(transparent)]
    Fs(#[from] mlwf_fs_util::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
