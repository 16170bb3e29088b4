//! Equilibrium iterate and result.

use crate::core::result::{OptimizationStatus, OptimumResult};
use crate::core::state::OptimumState;
use nalgebra::DVector;
use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// Species amounts and multipliers of an equilibrium calculation.
///
/// Used both as the initial guess and as the output of a solve. Vectors of the wrong
/// dimension (e.g. empty ones) are replaced by the solver's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquilibriumState {
    /// Species amounts
    pub n: DVector<f64>,
    /// Multipliers of the mass balance (element potentials divided by `RT`)
    pub y: DVector<f64>,
    /// Multipliers of the bounds `n ≥ 0`
    pub z: DVector<f64>,
}

impl EquilibriumState {
    pub fn new(n: DVector<f64>) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    pub(crate) fn to_optimum_state(&self) -> OptimumState {
        OptimumState::new(self.n.clone(), self.y.clone(), self.z.clone())
    }

    pub(crate) fn update_from(&mut self, state: OptimumState) {
        self.n = state.x;
        self.y = state.y;
        self.z = state.z;
    }
}

/// Outcome of an equilibrium calculation
#[derive(Debug, Clone, Default)]
pub struct EquilibriumResult {
    /// Result of the main solve
    pub optimum: OptimumResult,
    /// Result of the feasibility pre-pass, when it ran
    pub feasibility: Option<OptimumResult>,
}

impl EquilibriumResult {
    pub fn succeeded(&self) -> bool {
        self.optimum.succeeded
    }

    pub fn status(&self) -> OptimizationStatus {
        self.optimum.status
    }

    /// Iterations of the pre-pass and the main solve
    pub fn total_iterations(&self) -> usize {
        self.optimum.iterations + self.feasibility.as_ref().map_or(0, |r| r.iterations)
    }
}

impl Display for EquilibriumResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(feasibility) = &self.feasibility {
            writeln!(f, "Feasibility pre-pass:")?;
            writeln!(f, "{feasibility}")?;
        }
        write!(f, "{}", self.optimum)
    }
}
