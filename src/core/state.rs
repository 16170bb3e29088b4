//! Mutable iterate of the interior-point methods.

use nalgebra::{DMatrix, DVector};

/// Primal-dual iterate together with the evaluations cached at `x`.
///
/// While a solve is running, every entry of `x` and `z` is strictly positive. The cached
/// fields `f`, `g`, `h` and `a` always correspond to the current `x`; they are refreshed by
/// [`evaluate`](crate::optimizer::evaluate) after every update.
///
/// A state whose vectors have the wrong length (for example the empty default) is accepted
/// as an initial guess: the backends replace mismatched vectors by zeros before clipping
/// them into the interior.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimumState {
    /// Primal variables (n)
    pub x: DVector<f64>,
    /// Lagrange multipliers of the equality constraints (m)
    pub y: DVector<f64>,
    /// Multipliers of the bound constraints `x ≥ 0` (n)
    pub z: DVector<f64>,
    /// Objective value at `x`
    pub f: f64,
    /// Objective gradient at `x`
    pub g: DVector<f64>,
    /// Equality constraint residual at `x`
    pub h: DVector<f64>,
    /// Constraint Jacobian at `x`
    pub a: DMatrix<f64>,
}

impl Default for OptimumState {
    fn default() -> Self {
        Self {
            x: DVector::zeros(0),
            y: DVector::zeros(0),
            z: DVector::zeros(0),
            f: 0.0,
            g: DVector::zeros(0),
            h: DVector::zeros(0),
            a: DMatrix::zeros(0, 0),
        }
    }
}

impl OptimumState {
    /// Create a state from an initial guess; cached evaluations start empty.
    pub fn new(x: DVector<f64>, y: DVector<f64>, z: DVector<f64>) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Smallest primal entry (`+∞` when empty)
    pub fn min_x(&self) -> f64 {
        self.x.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Smallest bound multiplier (`+∞` when empty)
    pub fn min_z(&self) -> f64 {
        self.z.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Whether `x > 0` and `z > 0` hold entrywise
    pub fn is_interior(&self) -> bool {
        self.min_x() > 0.0 && self.min_z() > 0.0
    }
}
