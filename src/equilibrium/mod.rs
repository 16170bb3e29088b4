//! Chemical equilibrium on top of the interior-point optimizer.
//!
//! An equilibrium calculation minimizes the Gibbs energy `G(n)` of a chemical system over the
//! species amounts `n` subject to the elemental mass balance `W n = b` and `n > 0`, where `W`
//! is the formula matrix (elements × species) and `b` the element amounts. This module maps
//! that formulation onto [`OptimumProblem`](crate::core::problem::OptimumProblem) and drives
//! one of the optimizer backends:
//!
//! - [`GibbsModel`]: thermodynamic model supplying `G`, `μ` and `∂μ/∂n`
//! - [`EquilibriumProblem`]: model plus formula matrix and element amounts
//! - [`EquilibriumSolver`]: optional feasibility pre-pass, then the configured backend
//!
//! # Example
//!
//! ```
//! use equilibrium_solver::equilibrium::{
//!     EquilibriumOptions, EquilibriumProblem, EquilibriumSolver, EquilibriumState, IdealMixture,
//! };
//! use nalgebra::{dmatrix, dvector};
//!
//! // H2, O2, H2O in one gaseous phase
//! let model = IdealMixture::single_phase(dvector![0.0, 0.0, -10.0]);
//! let formula = dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0];
//! let problem = EquilibriumProblem::new(model, formula, dvector![4.0, 2.0])?;
//!
//! let mut solver = EquilibriumSolver::new(EquilibriumOptions::default());
//! let mut state = EquilibriumState::default();
//! let result = solver.solve(&problem, &mut state)?;
//! assert!(result.succeeded());
//! # Ok::<(), equilibrium_solver::EquilibriumSolverError>(())
//! ```

use crate::core::problem::HessianScheme;
use crate::linalg::KktStrategy;
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::error;

pub mod model;
pub mod options;
pub mod problem;
pub mod solver;
pub mod state;

pub use model::{GibbsModel, IdealMixture};
pub use options::EquilibriumOptions;
pub use problem::{EquilibriumProblem, GibbsOptimumProblem};
pub use solver::EquilibriumSolver;
pub use state::{EquilibriumResult, EquilibriumState};

/// Equilibrium formulation errors
#[derive(Debug, Clone, Error)]
pub enum EquilibriumError {
    /// Formula matrix, element amounts, model or state disagree on a dimension
    #[error("Inconsistent dimensions for {what}: expected {expected}, got {actual}")]
    InconsistentDimensions {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Thermodynamic model description is unusable
    #[error("Invalid thermodynamic model: {0}")]
    InvalidModel(String),

    /// Formula matrix or element amounts contain unusable values
    #[error("Invalid equilibrium input: {0}")]
    InvalidInput(String),

    /// Some element rows of the formula matrix are linear combinations of the others
    #[error(
        "Formula matrix has {elements} elements but rank {rank}: remove the redundant element rows"
    )]
    RedundantElements { rank: usize, elements: usize },
}

impl EquilibriumError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the underlying source error
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Hessian treatment of the Gibbs energy.
///
/// A single flag selecting both the Hessian representation and the KKT strategy suited to it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GibbsHessian {
    /// Full `∂μ/∂n`, factored with the Fullspace strategy
    #[default]
    Exact,
    /// Diagonal approximation of `∂μ/∂n`, factored with the Rangespace strategy
    Diagonal,
}

impl GibbsHessian {
    pub fn scheme(self) -> HessianScheme {
        match self {
            GibbsHessian::Exact => HessianScheme::Exact,
            GibbsHessian::Diagonal => HessianScheme::Diagonal,
        }
    }

    pub fn kkt_strategy(self) -> KktStrategy {
        match self {
            GibbsHessian::Exact => KktStrategy::Fullspace,
            GibbsHessian::Diagonal => KktStrategy::Rangespace,
        }
    }
}

impl Display for GibbsHessian {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GibbsHessian::Exact => write!(f, "Exact"),
            GibbsHessian::Diagonal => write!(f, "Diagonal"),
        }
    }
}
