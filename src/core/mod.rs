//! Core containers for the optimization engine
//!
//! This module contains the pieces every backend shares:
//! - Problem abstraction (objective, constraints and their derivatives)
//! - Iterate state (primal point, multipliers, cached evaluations)
//! - Result record (status, iteration count, residual, timing)

pub mod problem;
pub mod result;
pub mod state;

use thiserror::Error;
use tracing::error;

/// Core module error types for problem evaluation
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// An evaluation returned a vector or matrix of the wrong shape
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid input parameter or initial guess
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
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

/// Result type for core module operations
pub type CoreResult<T> = Result<T, CoreError>;
