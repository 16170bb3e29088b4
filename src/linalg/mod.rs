//! Structured solvers for the primal-dual KKT system.
//!
//! Each Newton iteration linearizes the optimality conditions into
//!
//! ```text
//! [ H   -Aᵀ  -I ] [dx]   [ rx ]
//! [ A    0    0 ] [dy] = [ ry ]
//! [ Z    0    X ] [dz]   [ rz ]
//! ```
//!
//! with `X = diag(x)`, `Z = diag(z)` and right-hand side `rx = -(g − Aᵀy − z)`,
//! `ry = -h`, `rz = -(x∘z − mu)`. Solvers expose two phases: [`KktSolver::decompose`]
//! factors the left-hand side once per iteration and [`KktSolver::solve`] back-substitutes
//! a right-hand side.
//!
//! The Rangespace and Nullspace strategies first eliminate `dz = (rz − z∘dx)/x`, which
//! leaves the condensed saddle-point system
//!
//! ```text
//! [ G  -Aᵀ ] [dx]   [ rx + rz/x ]
//! [ A   0  ] [dy] = [ ry        ]      G = H + diag(z/x)
//! ```

pub mod fullspace;
pub mod nullspace;
pub mod rangespace;

use crate::core::problem::Hessian;
use faer::{
    Mat, Side,
    linalg::solvers::{Llt, PartialPivLu, Solve},
};
use nalgebra::{DMatrix, DVector};
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::{debug, error};

pub use fullspace::FullspaceSolver;
pub use nullspace::NullspaceSolver;
pub use rangespace::RangespaceSolver;

/// Elimination used to solve the KKT system
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KktStrategy {
    /// Schur complement on the constraint range; best with a diagonal Hessian
    Rangespace,
    /// Pivoted LU of the full (2n + m) system
    #[default]
    Fullspace,
    /// Reduced Hessian on the null space of the constraint Jacobian
    Nullspace,
}

impl Display for KktStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KktStrategy::Rangespace => write!(f, "Rangespace"),
            KktStrategy::Fullspace => write!(f, "Fullspace"),
            KktStrategy::Nullspace => write!(f, "Nullspace"),
        }
    }
}

/// Linear algebra specific error types
#[derive(Debug, Clone, Error)]
pub enum LinAlgError {
    /// Matrix factorization failed (LU, Cholesky, ...)
    #[error("Matrix factorization failed: {0}")]
    FactorizationFailed(String),

    /// Singular or near-singular matrix detected
    #[error("Singular matrix detected (matrix is not invertible)")]
    SingularMatrix,

    /// Constraint Jacobian does not have full row rank
    #[error("Constraint Jacobian is rank deficient: rank {rank}, expected {expected}")]
    RankDeficient { rank: usize, expected: usize },

    /// Operands have inconsistent shapes
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// `solve` was called before a successful `decompose`
    #[error("KKT system has not been decomposed")]
    NotDecomposed,
}

impl LinAlgError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// operation()
    ///     .map_err(|e| LinAlgError::from(e).log())?;
    /// ```
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the original error from faer
    ///
    /// # Example
    /// ```ignore
    /// matrix.llt(Side::Lower).map_err(|e| {
    ///     LinAlgError::FactorizationFailed("Schur complement".to_string()).log_with_source(e)
    /// })?;
    /// ```
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for linear algebra operations
pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Left-hand side of the KKT system at the current iterate
#[derive(Debug, Clone, Copy)]
pub struct KktMatrix<'a> {
    /// Objective Hessian (dense or diagonal)
    pub h: &'a Hessian,
    /// Constraint Jacobian (m × n)
    pub a: &'a DMatrix<f64>,
    /// Primal iterate, strictly positive
    pub x: &'a DVector<f64>,
    /// Bound multipliers, strictly positive
    pub z: &'a DVector<f64>,
}

impl KktMatrix<'_> {
    /// Number of primal variables
    pub fn num_variables(&self) -> usize {
        self.x.len()
    }

    /// Number of equality constraints
    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// Check that every block has consistent dimensions
    pub fn validate(&self) -> LinAlgResult<()> {
        let n = self.x.len();
        if self.z.len() != n {
            return Err(LinAlgError::DimensionMismatch(format!(
                "z has {} entries, x has {}",
                self.z.len(),
                n
            )));
        }
        if self.h.dim() != n {
            return Err(LinAlgError::DimensionMismatch(format!(
                "Hessian has dimension {}, expected {}",
                self.h.dim(),
                n
            )));
        }
        if self.a.ncols() != n {
            return Err(LinAlgError::DimensionMismatch(format!(
                "Jacobian has {} columns, expected {}",
                self.a.ncols(),
                n
            )));
        }
        Ok(())
    }

    /// Diagonal `z/x` added to the Hessian once `dz` is eliminated
    pub fn barrier_diagonal(&self) -> DVector<f64> {
        self.z.component_div(self.x)
    }

    /// Dense condensed Hessian `G = H + diag(z/x)`
    pub fn condensed_hessian(&self) -> DMatrix<f64> {
        let mut g = self.h.to_dense();
        for (i, d) in self.barrier_diagonal().iter().enumerate() {
            g[(i, i)] += d;
        }
        g
    }
}

/// Right-hand side of the KKT system
#[derive(Debug, Clone, PartialEq)]
pub struct KktVector {
    pub rx: DVector<f64>,
    pub ry: DVector<f64>,
    pub rz: DVector<f64>,
}

/// Newton direction
#[derive(Debug, Clone, PartialEq)]
pub struct KktSolution {
    pub dx: DVector<f64>,
    pub dy: DVector<f64>,
    pub dz: DVector<f64>,
}

impl KktSolution {
    /// Whether every component of the direction is finite
    pub fn is_finite(&self) -> bool {
        self.dx
            .iter()
            .chain(self.dy.iter())
            .chain(self.dz.iter())
            .all(|v| v.is_finite())
    }
}

/// Factorization and back-substitution of the KKT system.
///
/// Implementations own their factorization state and reuse it between `decompose` and
/// `solve`; an instance must not be shared between concurrent solves.
pub trait KktSolver: Send {
    /// Build and factor the left-hand side at the current iterate
    ///
    /// # Errors
    /// Returns `LinAlgError` when the operands are inconsistent or the factorization fails.
    fn decompose(&mut self, lhs: &KktMatrix<'_>) -> LinAlgResult<()>;

    /// Solve for the Newton direction with the last factorization
    ///
    /// # Errors
    /// Returns `LinAlgError` when no factorization is available or the system is singular.
    fn solve(&self, rhs: &KktVector) -> LinAlgResult<KktSolution>;

    /// Strategy implemented by this solver
    fn strategy(&self) -> KktStrategy;
}

/// Create the KKT solver implementing `strategy`
pub fn create_kkt_solver(strategy: KktStrategy) -> Box<dyn KktSolver> {
    match strategy {
        KktStrategy::Rangespace => Box::new(RangespaceSolver::new()),
        KktStrategy::Fullspace => Box::new(FullspaceSolver::new()),
        KktStrategy::Nullspace => Box::new(NullspaceSolver::new()),
    }
}

/// Check that `rhs` matches the decomposed dimensions
pub(crate) fn check_rhs(rhs: &KktVector, n: usize, m: usize) -> LinAlgResult<()> {
    if rhs.rx.len() != n || rhs.rz.len() != n || rhs.ry.len() != m {
        return Err(LinAlgError::DimensionMismatch(format!(
            "right-hand side blocks ({}, {}, {}) do not match system ({}, {}, {})",
            rhs.rx.len(),
            rhs.ry.len(),
            rhs.rz.len(),
            n,
            m,
            n
        )));
    }
    Ok(())
}

/// Condensed primal right-hand side `rx + rz/x`
pub(crate) fn condensed_rhs(rhs: &KktVector, x: &DVector<f64>) -> DVector<f64> {
    &rhs.rx + rhs.rz.component_div(x)
}

/// Recover the bound multiplier step `dz = (rz − z∘dx)/x`
pub(crate) fn recover_dz(
    rhs: &KktVector,
    x: &DVector<f64>,
    z: &DVector<f64>,
    dx: &DVector<f64>,
) -> DVector<f64> {
    (&rhs.rz - z.component_mul(dx)).component_div(x)
}

/// Factorization of a symmetric matrix: Cholesky when positive definite, pivoted LU otherwise
pub(crate) enum SymmetricFactor {
    Llt(Llt<f64>),
    Lu(PartialPivLu<f64>),
}

impl SymmetricFactor {
    pub(crate) fn factorize(matrix: &Mat<f64>) -> LinAlgResult<Self> {
        if (0..matrix.nrows()).any(|i| (0..matrix.ncols()).any(|j| !matrix[(i, j)].is_finite())) {
            return Err(LinAlgError::FactorizationFailed(
                "matrix contains non-finite entries".to_string(),
            )
            .log());
        }

        match matrix.llt(Side::Lower) {
            Ok(llt) => Ok(SymmetricFactor::Llt(llt)),
            Err(e) => {
                debug!("Cholesky factorization failed ({:?}), falling back to LU", e);
                Ok(SymmetricFactor::Lu(matrix.partial_piv_lu()))
            }
        }
    }

    pub(crate) fn solve(&self, rhs: &Mat<f64>) -> Mat<f64> {
        match self {
            SymmetricFactor::Llt(llt) => llt.solve(rhs),
            SymmetricFactor::Lu(lu) => lu.solve(rhs),
        }
    }
}

pub(crate) fn to_faer(matrix: &DMatrix<f64>) -> Mat<f64> {
    Mat::from_fn(matrix.nrows(), matrix.ncols(), |i, j| matrix[(i, j)])
}

pub(crate) fn column_to_faer(vector: &DVector<f64>) -> Mat<f64> {
    Mat::from_fn(vector.len(), 1, |i, _| vector[i])
}

pub(crate) fn from_faer(matrix: &Mat<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(matrix.nrows(), matrix.ncols(), |i, j| matrix[(i, j)])
}

pub(crate) fn column_from_faer(matrix: &Mat<f64>) -> DVector<f64> {
    DVector::from_fn(matrix.nrows(), |i, _| matrix[(i, 0)])
}
