//! Interior-point Newton method with a fixed barrier parameter.
//!
//! Each iteration solves the primal-dual KKT system for the Newton direction and moves
//! along it as far as the fraction-to-the-boundary rule allows:
//!
//! 1. Stop when the iteration counter exceeds `max_iterations`
//! 2. Assemble the Hessian in the configured scheme and factor the KKT system
//! 3. Solve for `(dx, dy, dz)` with right-hand side `-(g − Aᵀy − z, h, x∘z − mu)`
//! 4. Compute `alpha_x`, `alpha_z` so that `x` and `z` stay strictly positive
//! 5. Update the iterate (per block, or uniformly with `min(alpha_x, alpha_z)`)
//! 6. Re-evaluate the problem and measure `‖g − Aᵀy − z‖∞`, `‖h‖∞`, `‖x∘z − mu‖∞`
//! 7. Converged when the largest of the three drops below `tolerance`
//!
//! Since `mu` stays fixed, the converged point is the center of the barrier problem, not
//! an exact KKT point. A small `mu` (default `1e-20`) makes the two indistinguishable for
//! practical tolerances.
//!
//! # Examples
//!
//! ```
//! use equilibrium_solver::{Hessian, IpNewton, OptimumOptions, OptimumProblem, OptimumState};
//! use nalgebra::{DMatrix, DVector, dmatrix, dvector};
//!
//! struct Quadratic;
//!
//! impl OptimumProblem for Quadratic {
//!     fn num_variables(&self) -> usize { 2 }
//!     fn num_constraints(&self) -> usize { 1 }
//!     fn objective(&self, x: &DVector<f64>) -> f64 { x.norm_squared() }
//!     fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> { 2.0 * x }
//!     fn objective_hessian(&self, _x: &DVector<f64>, _g: &DVector<f64>) -> Hessian {
//!         Hessian::Diagonal(dvector![2.0, 2.0])
//!     }
//!     fn constraint(&self, x: &DVector<f64>) -> DVector<f64> { dvector![x[0] + x[1] - 1.0] }
//!     fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> { dmatrix![1.0, 1.0] }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut solver = IpNewton::new();
//! let mut state = OptimumState::default();
//! let result = solver.solve(&Quadratic, &mut state, &OptimumOptions::new().with_tolerance(1e-8))?;
//! assert!(result.succeeded);
//! assert!((state.x[0] - 0.5).abs() < 1e-6);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    problem::OptimumProblem,
    result::{OptimizationStatus, OptimumResult},
    state::OptimumState,
};
use crate::linalg::{KktMatrix, KktSolution, KktSolver, KktStrategy, create_kkt_solver};
use crate::optimizer::{
    OptObserver, OptObserverVec, OptimizerResult, SolveMonitor, Solver, apply_step,
    assemble_hessian, compute_residuals, options::OptimumOptions, step_lengths,
};
use tracing::warn;
use web_time::{Duration, Instant};

/// Outcome of one attempt to compute the Newton direction
pub(crate) enum Direction {
    Found(KktSolution),
    Failed,
}

/// Factor the KKT system at the current iterate and solve for the Newton direction.
///
/// Any factorization failure or non-finite component is reported as `Direction::Failed`;
/// the time spent is added to `linear_time` either way.
pub(crate) fn newton_direction(
    kkt: &mut dyn KktSolver,
    problem: &dyn OptimumProblem,
    state: &OptimumState,
    options: &OptimumOptions,
    linear_time: &mut Duration,
) -> OptimizerResult<Direction> {
    let hessian = assemble_hessian(problem, state, options.hessian_scheme)?;
    let rhs = compute_residuals(state, options.mu);
    let lhs = KktMatrix {
        h: &hessian,
        a: &state.a,
        x: &state.x,
        z: &state.z,
    };

    let start = Instant::now();
    let solved = kkt.decompose(&lhs).and_then(|()| kkt.solve(&rhs));
    *linear_time += start.elapsed();

    Ok(match solved {
        Ok(solution) if solution.is_finite() => Direction::Found(solution),
        Ok(_) => {
            warn!("Newton direction contains non-finite values");
            Direction::Failed
        }
        Err(e) => {
            warn!("KKT system could not be solved: {}", e);
            Direction::Failed
        }
    })
}

/// Reuse `cached` when it implements `strategy`, otherwise create a new solver
pub(crate) fn take_kkt_solver(
    cached: &mut Option<Box<dyn KktSolver>>,
    strategy: KktStrategy,
) -> Box<dyn KktSolver> {
    match cached.take() {
        Some(solver) if solver.strategy() == strategy => solver,
        _ => create_kkt_solver(strategy),
    }
}

/// Interior-point Newton solver.
///
/// The KKT solver and its factorization buffers are kept between calls and reused when the
/// strategy does not change. A solver instance must not be shared between concurrent solves.
pub struct IpNewton {
    kkt: Option<Box<dyn KktSolver>>,
    observers: OptObserverVec,
}

impl Default for IpNewton {
    fn default() -> Self {
        Self::new()
    }
}

impl IpNewton {
    pub fn new() -> Self {
        Self {
            kkt: None,
            observers: OptObserverVec::new(),
        }
    }

    /// Add an observer notified after every iteration.
    pub fn add_observer(&mut self, observer: impl OptObserver + 'static) {
        self.observers.add(observer);
    }

    /// Run the interior-point Newton iterations.
    ///
    /// # Errors
    /// `OptimizerError::InvalidParameters` for invalid options and `OptimizerError::Core`
    /// when the problem returns evaluations of the wrong dimension.
    pub fn solve(
        &mut self,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
    ) -> OptimizerResult<OptimumResult> {
        let mut monitor = SolveMonitor::begin("IpNewton", problem, state, options)?;
        let mut kkt = take_kkt_solver(&mut self.kkt, options.kkt_strategy);

        let status = loop {
            if let Some(status) = monitor.next_iteration(options) {
                break status;
            }

            let direction =
                newton_direction(kkt.as_mut(), problem, state, options, &mut monitor.linear_time)?;
            let solution = match direction {
                Direction::Found(solution) => solution,
                Direction::Failed => break OptimizationStatus::NumericalFailure,
            };

            let steps = step_lengths(state, &solution, options.tau);
            apply_step(state, &solution, &steps, options.uniform_newton_step);

            if let Some(status) =
                monitor.end_iteration(problem, state, options, &steps, &self.observers)?
            {
                break status;
            }
        };

        self.kkt = Some(kkt);
        Ok(monitor.finish(status))
    }
}

impl Solver for IpNewton {
    fn solve(
        &mut self,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
    ) -> OptimizerResult<OptimumResult> {
        IpNewton::solve(self, problem, state, options)
    }

    fn observers_mut(&mut self) -> &mut OptObserverVec {
        &mut self.observers
    }
}
