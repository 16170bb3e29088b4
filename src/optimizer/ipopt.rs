//! Interior-point method with a backtracking line search.
//!
//! Shares initialization, KKT direction and convergence measure with
//! [`IpNewton`](crate::optimizer::IpNewton). The primal step is additionally shortened until
//! the barrier merit function
//!
//! ```text
//! phi(x) = f(x) − mu·Σ ln x_i + nu·‖h(x)‖₁,     nu = ‖y + dy‖∞ + 1
//! ```
//!
//! decreases sufficiently (Armijo condition with directional derivative
//! `D = (g − mu/x)ᵀ dx − nu·‖h‖₁`). The search starts from the fraction-to-the-boundary
//! step, so the iterate stays strictly positive. The accepted step is applied like the
//! Newton step of [`IpNewton`](crate::optimizer::IpNewton): per block (`x` by the searched
//! step, `y` in full, `z` by `alpha_z`), or with `min(searched step, alpha_z)` for all three
//! blocks when `uniform_newton_step` is set.

use crate::core::{
    problem::OptimumProblem,
    result::{OptimizationStatus, OptimumResult},
    state::OptimumState,
};
use crate::linalg::{KktSolution, KktSolver};
use crate::optimizer::{
    OptObserver, OptObserverVec, OptimizerResult, SolveMonitor, Solver, StepLengths, apply_step,
    ipnewton::{Direction, newton_direction, take_kkt_solver},
    options::{IpOptParams, OptimumOptions},
    step_lengths,
};
use nalgebra::DVector;
use tracing::debug;

/// Barrier merit function `f − mu·Σ ln x + nu·‖h‖₁`
fn merit(f: f64, x: &DVector<f64>, h: &DVector<f64>, mu: f64, nu: f64) -> f64 {
    f - mu * x.iter().map(|v| v.ln()).sum::<f64>() + nu * h.lp_norm(1)
}

/// Outcome of the backtracking search
#[derive(Debug, Clone, Copy, PartialEq)]
struct LineSearch {
    alpha: f64,
    backtracks: usize,
    evaluations: usize,
}

/// Interior-point solver with merit-function line search
pub struct IpOpt {
    kkt: Option<Box<dyn KktSolver>>,
    observers: OptObserverVec,
}

impl Default for IpOpt {
    fn default() -> Self {
        Self::new()
    }
}

impl IpOpt {
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

    /// Backtrack from `alpha_max` until the Armijo condition holds.
    ///
    /// Skipped (full `alpha_max`) when `dx` is not a descent direction of the merit function.
    /// When no trial point qualifies within `max_backtracks`, the last trial step is kept.
    fn line_search(
        problem: &dyn OptimumProblem,
        state: &OptimumState,
        solution: &KktSolution,
        alpha_max: f64,
        mu: f64,
        params: &IpOptParams,
    ) -> LineSearch {
        let nu = (&state.y + &solution.dy).amax() + 1.0;
        let phi = merit(state.f, &state.x, &state.h, mu, nu);
        let slope = (&state.g - state.x.map(|xi| mu / xi)).dot(&solution.dx)
            - nu * state.h.lp_norm(1);

        let mut search = LineSearch {
            alpha: alpha_max,
            backtracks: 0,
            evaluations: 0,
        };
        if !(slope < 0.0) {
            return search;
        }

        while search.backtracks < params.max_backtracks {
            let trial = &state.x + &solution.dx * search.alpha;
            let phi_trial = merit(
                problem.objective(&trial),
                &trial,
                &problem.constraint(&trial),
                mu,
                nu,
            );
            search.evaluations += 1;

            if phi_trial.is_finite() && phi_trial <= phi + params.armijo * search.alpha * slope {
                break;
            }
            search.alpha *= params.backtrack_factor;
            search.backtracks += 1;
        }
        search
    }

    /// Run the line-search interior-point iterations.
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
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                "Line search: armijo {:.1e}, backtrack factor {:.2}, max backtracks {}",
                options.ipopt.armijo, options.ipopt.backtrack_factor, options.ipopt.max_backtracks
            );
        }
        let mut monitor = SolveMonitor::begin("IpOpt", problem, state, options)?;
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

            let safeguard = step_lengths(state, &solution, options.tau);
            let search = Self::line_search(
                problem,
                state,
                &solution,
                safeguard.alpha_x,
                options.mu,
                &options.ipopt,
            );
            monitor.result.function_evaluations += search.evaluations;
            if search.backtracks > 0 {
                debug!(
                    "iteration {}: {} backtracks, alpha_x {:.3e} -> {:.3e}",
                    monitor.result.iterations, search.backtracks, safeguard.alpha_x, search.alpha
                );
            }

            let steps = StepLengths {
                alpha: search.alpha.min(safeguard.alpha_z),
                alpha_x: search.alpha,
                alpha_z: safeguard.alpha_z,
            };
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

impl Solver for IpOpt {
    fn solve(
        &mut self,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
    ) -> OptimizerResult<OptimumResult> {
        IpOpt::solve(self, problem, state, options)
    }

    fn observers_mut(&mut self) -> &mut OptObserverVec {
        &mut self.observers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::problem::{Hessian, HessianScheme};
    use crate::linalg::KktStrategy;
    use nalgebra::{DMatrix, dmatrix, dvector};

    const TOLERANCE: f64 = 1e-6;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// minimize x1² + x2² subject to x1 + x2 = 1
    struct Quadratic;

    impl OptimumProblem for Quadratic {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            x.norm_squared()
        }
        fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            2.0 * x
        }
        fn objective_hessian(&self, _x: &DVector<f64>, _g: &DVector<f64>) -> Hessian {
            Hessian::Diagonal(dvector![2.0, 2.0])
        }
        fn constraint(&self, x: &DVector<f64>) -> DVector<f64> {
            dvector![x[0] + x[1] - 1.0]
        }
        fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            dmatrix![1.0, 1.0]
        }
    }

    #[test]
    fn test_merit_function() {
        let x = dvector![1.0, std::f64::consts::E];
        let h = dvector![0.5, -0.25];
        // 2 - 0.1 * (0 + 1) + 2 * 0.75
        assert!((merit(2.0, &x, &h, 0.1, 2.0) - 3.4).abs() < 1e-12);
    }

    #[test]
    fn test_quadratic_converges() -> TestResult {
        for (strategy, scheme) in [
            (KktStrategy::Fullspace, HessianScheme::Exact),
            (KktStrategy::Rangespace, HessianScheme::Diagonal),
        ] {
            let mut solver = IpOpt::new();
            let mut state = OptimumState::default();
            let options = OptimumOptions::new()
                .with_tolerance(1e-8)
                .with_kkt_strategy(strategy)
                .with_hessian_scheme(scheme);

            let result = solver.solve(&Quadratic, &mut state, &options)?;

            assert!(result.succeeded, "{strategy} did not converge");
            assert!((state.x[0] - 0.5).abs() < TOLERANCE);
            assert!((state.x[1] - 0.5).abs() < TOLERANCE);
        }
        Ok(())
    }

    #[test]
    fn test_feasible_start_takes_full_step() -> TestResult {
        // From a feasible point the Newton step lands on the minimizer and passes Armijo
        let mut solver = IpOpt::new();
        let mut state = OptimumState::new(dvector![0.2, 0.8], DVector::zeros(0), DVector::zeros(0));
        let options = OptimumOptions::new().with_tolerance(1e-8);

        let result = solver.solve(&Quadratic, &mut state, &options)?;

        assert!(result.succeeded);
        assert!(result.iterations <= 2);
        Ok(())
    }

    #[test]
    fn test_uniform_step_follows_newton_step() -> TestResult {
        // First step from (0.2, 0.8): the Armijo condition holds at alpha_x = 1, while
        // alpha_z ≈ 0.62 limits the uniform step
        let start = OptimumState::new(dvector![0.2, 0.8], dvector![0.0], dvector![1.0, 1.0]);
        let uniform = OptimumOptions::new()
            .with_max_iterations(1)
            .with_uniform_newton_step(true);

        let mut newton_state = start.clone();
        crate::optimizer::IpNewton::new().solve(&Quadratic, &mut newton_state, &uniform)?;
        let mut uniform_state = start.clone();
        let result = IpOpt::new().solve(&Quadratic, &mut uniform_state, &uniform)?;
        assert_eq!(result.status, OptimizationStatus::MaxIterationsReached);
        assert!((&uniform_state.x - &newton_state.x).amax() < TOLERANCE);
        assert!((&uniform_state.y - &newton_state.y).amax() < TOLERANCE);
        assert!((&uniform_state.z - &newton_state.z).amax() < TOLERANCE);
        assert!((uniform_state.x[0] - 0.27311).abs() < 1e-4);

        let mut split_state = start;
        IpOpt::new().solve(&Quadratic, &mut split_state, &uniform.with_uniform_newton_step(false))?;
        assert!((split_state.x[0] - 0.31707).abs() < 1e-4);
        assert!((split_state.y[0] - 1.21951).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_line_search_skipped_for_ascent_direction() {
        let mut state = OptimumState::new(dvector![1.0, 1.0], dvector![0.0], dvector![1.0, 1.0]);
        state.f = 2.0;
        state.g = dvector![2.0, 2.0];
        state.h = dvector![0.0];
        let solution = KktSolution {
            dx: dvector![1.0, 1.0],
            dy: dvector![0.0],
            dz: dvector![0.0, 0.0],
        };

        let search = IpOpt::line_search(
            &Quadratic,
            &state,
            &solution,
            0.7,
            1e-8,
            &IpOptParams::default(),
        );
        assert_eq!(search.alpha, 0.7);
        assert_eq!(search.evaluations, 0);
    }

    #[test]
    fn test_line_search_backtracks_on_overshoot() {
        // Moving far along -x overshoots the minimum of the merit function
        let mut state = OptimumState::new(dvector![1.0, 1.0], dvector![0.0], dvector![1.0, 1.0]);
        state.f = 2.0;
        state.g = dvector![2.0, 2.0];
        state.h = dvector![1.0];
        let solution = KktSolution {
            dx: dvector![-0.999, -0.999],
            dy: dvector![0.0],
            dz: dvector![0.0, 0.0],
        };

        let search = IpOpt::line_search(
            &Quadratic,
            &state,
            &solution,
            1.0,
            0.5,
            &IpOptParams::default(),
        );
        assert!(search.backtracks > 0);
        assert!(search.alpha < 1.0);
        assert_eq!(search.evaluations, search.backtracks + 1);
    }
}
