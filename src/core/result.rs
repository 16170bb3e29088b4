//! Outcome of a single optimization run.

use std::{
    fmt,
    fmt::{Display, Formatter},
};
use web_time::Duration;

/// Why an optimization run stopped
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Residual error dropped below the tolerance
    Converged,
    /// Iteration counter exceeded the configured maximum
    #[default]
    MaxIterationsReached,
    /// Objective or gradient became NaN/Inf after a step
    InvalidNumericalValues,
    /// KKT factorization failed or produced a non-finite direction
    NumericalFailure,
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::Converged => write!(f, "Converged"),
            OptimizationStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            OptimizationStatus::InvalidNumericalValues => {
                write!(f, "Invalid numerical values (NaN/Inf) detected")
            }
            OptimizationStatus::NumericalFailure => write!(f, "Numerical failure"),
        }
    }
}

/// Infinity norms of the three optimality residuals.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ErrorNorms {
    /// `‖g − Aᵀy − z‖∞`
    pub stationarity: f64,
    /// `‖h‖∞`
    pub feasibility: f64,
    /// `‖x∘z − mu‖∞`
    pub centering: f64,
}

impl ErrorNorms {
    /// Largest of the three components
    pub fn max(&self) -> f64 {
        self.stationarity.max(self.feasibility).max(self.centering)
    }
}

/// Result record produced once per solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimumResult {
    /// `true` exactly when `status` is [`OptimizationStatus::Converged`]
    pub succeeded: bool,
    pub status: OptimizationStatus,
    /// Value of the iteration counter when the loop stopped
    pub iterations: usize,
    /// Final residual, the maximum of `errors`
    pub error: f64,
    pub errors: ErrorNorms,
    /// Wall-clock time of the whole solve
    pub time: Duration,
    /// Cumulative time spent in KKT decompose and solve
    pub time_linear_systems: Duration,
    /// Number of problem evaluations (objective, gradient, constraints, Jacobian)
    pub function_evaluations: usize,
}

impl OptimumResult {
    pub(crate) fn finish(&mut self, status: OptimizationStatus) {
        self.status = status;
        self.succeeded = status == OptimizationStatus::Converged;
    }
}

impl Display for OptimumResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization result:")?;
        writeln!(f, "  Status:            {}", self.status)?;
        writeln!(f, "  Succeeded:         {}", self.succeeded)?;
        writeln!(f, "  Iterations:        {}", self.iterations)?;
        writeln!(f, "  Error:             {:.6e}", self.error)?;
        writeln!(
            f,
            "    stationarity {:.3e} | feasibility {:.3e} | centering {:.3e}",
            self.errors.stationarity, self.errors.feasibility, self.errors.centering
        )?;
        writeln!(f, "  Evaluations:       {}", self.function_evaluations)?;
        writeln!(
            f,
            "  Time:              {:.3}ms (linear systems {:.3}ms)",
            self.time.as_secs_f64() * 1000.0,
            self.time_linear_systems.as_secs_f64() * 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_norms_max() {
        let errors = ErrorNorms {
            stationarity: 1e-3,
            feasibility: 5e-2,
            centering: 1e-9,
        };
        assert_eq!(errors.max(), 5e-2);
    }

    #[test]
    fn test_finish_sets_success_flag() {
        let mut result = OptimumResult::default();
        assert!(!result.succeeded);

        result.finish(OptimizationStatus::Converged);
        assert!(result.succeeded);

        result.finish(OptimizationStatus::NumericalFailure);
        assert!(!result.succeeded);
        assert!(result.to_string().contains("Numerical failure"));
    }
}
