//! Error types for the equilibrium-solver library
//!
//! This module provides the top-level error and result types exposed by public APIs.
//!
//! # Error Hierarchy
//!
//! - **`EquilibriumSolverError`** is the error returned to users
//! - **Module errors** (`CoreError`, `LinAlgError`, `OptimizerError`, ...) are wrapped inside it
//! - **Error sources** are preserved, so the full chain can be inspected
//!
//! Numerical aborts inside the iteration loop (iteration budget, non-finite values, failed
//! Newton direction) are not errors: they are reported through
//! [`OptimumResult::succeeded`](crate::core::result::OptimumResult) instead. Errors here
//! describe misconfiguration or a problem that breaks its own dimension contract.
//!
//! Example error chain:
//! ```text
//! EquilibriumSolverError::Optimizer(
//!     OptimizerError::LinAlg(
//!         LinAlgError::RankDeficient { rank: 1, expected: 2 }
//!     )
//! )
//! ```

use crate::{
    core::CoreError, equilibrium::EquilibriumError, linalg::LinAlgError,
    observers::ObserverError, optimizer::OptimizerError,
};
use std::error::Error as StdError;
use thiserror::Error;

/// Main result type used throughout the equilibrium-solver library
pub type EquilibriumSolverResult<T> = Result<T, EquilibriumSolverError>;

/// Main error type for the equilibrium-solver library
#[derive(Debug, Error)]
pub enum EquilibriumSolverError {
    /// Problem evaluation errors (dimension contract violations)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Optimization backend errors
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Linear algebra errors
    #[error(transparent)]
    LinearAlgebra(#[from] LinAlgError),

    /// Observer errors
    #[error(transparent)]
    Observer(#[from] ObserverError),

    /// Equilibrium formulation errors
    #[error(transparent)]
    Equilibrium(#[from] EquilibriumError),
}

impl EquilibriumSolverError {
    /// Get the full error chain as a multi-line string.
    ///
    /// ```rust,ignore
    /// if let Err(e) = solver.solve(&problem, &mut state, &options) {
    ///     warn!("Full chain: {}", e.chain());
    /// }
    /// ```
    pub fn chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(format!("  → {}", err));
            source = err.source();
        }

        chain.join("\n")
    }

    /// Get a compact single-line error chain for logging
    pub fn chain_compact(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }

        chain.join(" → ")
    }
}
