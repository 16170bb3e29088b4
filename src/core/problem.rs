//! Problem abstraction for equality-constrained minimization over the positive orthant.
//!
//! An [`OptimumProblem`] describes
//!
//! ```text
//! minimize    f(x)
//! subject to  h(x) = 0,   x ≥ 0
//! ```
//!
//! through pure evaluators: the objective `f`, its gradient `g`, its Hessian `H`, the
//! equality constraint `h` (m entries) and its dense Jacobian `A` (m × n). Implementations
//! must be stateless: the optimizer re-evaluates them at arbitrary points, possibly many
//! times at the same point.
//!
//! The Hessian may be returned either as a dense symmetric matrix or as its diagonal. Which
//! representation the KKT solver actually receives is decided by the caller through
//! [`HessianScheme`], not discovered at runtime.

use nalgebra::{DMatrix, DVector};
use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// Representation of the objective Hessian handed to the KKT solver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HessianScheme {
    /// Use the full symmetric Hessian
    #[default]
    Exact,
    /// Keep only the diagonal of the Hessian
    Diagonal,
}

impl Display for HessianScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            HessianScheme::Exact => write!(f, "Exact"),
            HessianScheme::Diagonal => write!(f, "Diagonal"),
        }
    }
}

/// Objective Hessian, either dense or diagonal.
#[derive(Debug, Clone, PartialEq)]
pub enum Hessian {
    /// Full symmetric n × n matrix
    Dense(DMatrix<f64>),
    /// Diagonal entries only
    Diagonal(DVector<f64>),
}

impl Hessian {
    /// Number of variables the Hessian refers to
    pub fn dim(&self) -> usize {
        match self {
            Hessian::Dense(h) => h.nrows(),
            Hessian::Diagonal(d) => d.len(),
        }
    }

    /// Diagonal entries of the Hessian.
    pub fn diagonal(&self) -> DVector<f64> {
        match self {
            Hessian::Dense(h) => h.diagonal(),
            Hessian::Diagonal(d) => d.clone(),
        }
    }

    /// Dense n × n matrix form of the Hessian.
    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Hessian::Dense(h) => h.clone(),
            Hessian::Diagonal(d) => DMatrix::from_diagonal(d),
        }
    }

    /// Convert into the representation required by `scheme`.
    ///
    /// A dense Hessian under the diagonal scheme drops its off-diagonal entries; a diagonal
    /// Hessian under the exact scheme becomes a diagonal matrix.
    pub fn into_scheme(self, scheme: HessianScheme) -> Hessian {
        match (scheme, self) {
            (HessianScheme::Exact, Hessian::Diagonal(d)) => {
                Hessian::Dense(DMatrix::from_diagonal(&d))
            }
            (HessianScheme::Diagonal, Hessian::Dense(h)) => Hessian::Diagonal(h.diagonal()),
            (_, hessian) => hessian,
        }
    }

    /// Whether the Hessian is stored as a diagonal
    pub fn is_diagonal(&self) -> bool {
        matches!(self, Hessian::Diagonal(_))
    }

    /// Whether every stored entry is finite
    pub fn is_finite(&self) -> bool {
        match self {
            Hessian::Dense(h) => h.iter().all(|v| v.is_finite()),
            Hessian::Diagonal(d) => d.iter().all(|v| v.is_finite()),
        }
    }
}

/// Evaluator contract for a constrained minimization problem.
///
/// # Example
///
/// ```
/// use equilibrium_solver::core::problem::{Hessian, OptimumProblem};
/// use nalgebra::{DMatrix, DVector, dmatrix, dvector};
///
/// /// minimize x1² + x2² subject to x1 + x2 = 1
/// struct Quadratic;
///
/// impl OptimumProblem for Quadratic {
///     fn num_variables(&self) -> usize { 2 }
///     fn num_constraints(&self) -> usize { 1 }
///     fn objective(&self, x: &DVector<f64>) -> f64 { x.norm_squared() }
///     fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> { 2.0 * x }
///     fn objective_hessian(&self, _x: &DVector<f64>, _g: &DVector<f64>) -> Hessian {
///         Hessian::Diagonal(dvector![2.0, 2.0])
///     }
///     fn constraint(&self, x: &DVector<f64>) -> DVector<f64> { dvector![x[0] + x[1] - 1.0] }
///     fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> { dmatrix![1.0, 1.0] }
/// }
/// ```
pub trait OptimumProblem {
    /// Number of primal variables `n`
    fn num_variables(&self) -> usize;

    /// Number of equality constraints `m`
    fn num_constraints(&self) -> usize;

    /// Objective value `f(x)`
    fn objective(&self, x: &DVector<f64>) -> f64;

    /// Objective gradient `g(x)` (n entries)
    fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Objective Hessian at `x`; `gradient` is the gradient already evaluated at `x`
    fn objective_hessian(&self, x: &DVector<f64>, gradient: &DVector<f64>) -> Hessian;

    /// Equality constraint residual `h(x)` (m entries)
    fn constraint(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Dense constraint Jacobian `A(x)` (m × n)
    fn constraint_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64>;
}

impl<P: OptimumProblem + ?Sized> OptimumProblem for &P {
    fn num_variables(&self) -> usize {
        (**self).num_variables()
    }

    fn num_constraints(&self) -> usize {
        (**self).num_constraints()
    }

    fn objective(&self, x: &DVector<f64>) -> f64 {
        (**self).objective(x)
    }

    fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        (**self).objective_gradient(x)
    }

    fn objective_hessian(&self, x: &DVector<f64>, gradient: &DVector<f64>) -> Hessian {
        (**self).objective_hessian(x, gradient)
    }

    fn constraint(&self, x: &DVector<f64>) -> DVector<f64> {
        (**self).constraint(x)
    }

    fn constraint_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        (**self).constraint_jacobian(x)
    }
}

/// Restriction of a problem to its constraints.
///
/// The objective is replaced by zero (with zero gradient and Hessian), so solving it with a
/// fixed barrier yields a strictly interior point satisfying `h(x) = 0`. Used as a feasibility
/// pre-pass before the full solve.
pub struct FeasibilityProblem<P> {
    inner: P,
}

impl<P: OptimumProblem> FeasibilityProblem<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: OptimumProblem> OptimumProblem for FeasibilityProblem<P> {
    fn num_variables(&self) -> usize {
        self.inner.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.inner.num_constraints()
    }

    fn objective(&self, _x: &DVector<f64>) -> f64 {
        0.0
    }

    fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::zeros(x.len())
    }

    fn objective_hessian(&self, x: &DVector<f64>, _gradient: &DVector<f64>) -> Hessian {
        Hessian::Diagonal(DVector::zeros(x.len()))
    }

    fn constraint(&self, x: &DVector<f64>) -> DVector<f64> {
        self.inner.constraint(x)
    }

    fn constraint_jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        self.inner.constraint_jacobian(x)
    }
}
