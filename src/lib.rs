//! # Equilibrium Solver
//!
//! Interior-point optimization core for chemical equilibrium calculations: minimize the
//! Gibbs energy of a system over species amounts subject to elemental mass balance and
//! non-negative amounts.
//!
//! ## Features
//!
//! - **Generic problem abstraction**: objective, gradient, Hessian, equality constraints and
//!   their Jacobian over a real vector of fixed dimension
//! - **Interior-point Newton driver**: fixed-barrier primal-dual Newton iterations with the
//!   fraction-to-the-boundary safeguard keeping every iterate strictly interior
//! - **Structured KKT solvers**: Rangespace, Fullspace and Nullspace eliminations of the
//!   saddle-point system, selected once per solve
//! - **Equilibrium adapter**: maps a Gibbs energy model and a formula matrix onto the generic
//!   problem, with an optional feasibility pre-pass and interchangeable backends
//!
//! ## Optimizer Backends
//!
//! - **IpNewton**: full Newton steps truncated only by the fraction-to-the-boundary rule
//! - **IpOpt**: the same Newton direction followed by a backtracking line search on a
//!   barrier merit function
//!
//! ## KKT Strategies
//!
//! - **Rangespace**: eliminates the bound multipliers and factors the Schur complement;
//!   cheapest with a diagonal Hessian
//! - **Fullspace**: factors the full indefinite system with pivoted LU; most robust
//! - **Nullspace**: projects onto the null space of the constraint Jacobian; suited to few
//!   constraints and many variables

pub mod core;
pub mod equilibrium;
pub mod error;
pub mod linalg;
#[cfg(feature = "logging")]
pub mod logger;
pub mod observers;
pub mod optimizer;

pub use core::problem::{Hessian, HessianScheme, OptimumProblem};
pub use core::result::{ErrorNorms, OptimizationStatus, OptimumResult};
pub use core::state::OptimumState;
pub use error::{EquilibriumSolverError, EquilibriumSolverResult};

pub use equilibrium::{
    EquilibriumOptions, EquilibriumProblem, EquilibriumResult, EquilibriumSolver,
    EquilibriumState, GibbsHessian, GibbsModel, IdealMixture,
};
pub use linalg::{KktSolver, KktStrategy};
#[cfg(feature = "logging")]
pub use logger::{init_logger, init_logger_with_level};
pub use optimizer::{
    IpNewton, IpOpt, OptObserver, OptObserverVec, OptimizerType, Solver,
    options::{OptimumOptions, OutputOptions},
};
