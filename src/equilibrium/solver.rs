//! Equilibrium solver: feasibility pre-pass and backend dispatch.

use crate::core::problem::FeasibilityProblem;
use crate::core::state::OptimumState;
use crate::equilibrium::{
    EquilibriumError, EquilibriumOptions, EquilibriumProblem, EquilibriumResult,
    EquilibriumState, GibbsHessian, GibbsModel, GibbsOptimumProblem,
};
use crate::error::EquilibriumSolverResult;
use crate::optimizer::{self, IpNewton, OptObserver, OptimumResult, Solver};
use nalgebra::DVector;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

/// Solver of equilibrium problems.
///
/// Owns one backend instance (and its KKT factorization buffers), so a solver must not be
/// shared between concurrent calculations. Independent calculations each create their own
/// solver, see [`EquilibriumSolver::solve_batch`].
pub struct EquilibriumSolver {
    options: EquilibriumOptions,
    backend: Box<dyn Solver>,
    prepass: IpNewton,
}

impl EquilibriumSolver {
    pub fn new(options: EquilibriumOptions) -> Self {
        Self {
            backend: optimizer::create_solver(options.algorithm),
            prepass: IpNewton::new(),
            options,
        }
    }

    pub fn options(&self) -> &EquilibriumOptions {
        &self.options
    }

    /// Add an observer of the main solve.
    pub fn add_observer(&mut self, observer: impl OptObserver + 'static) {
        self.backend.observers_mut().add(observer);
    }

    /// Run the feasibility pre-pass alone.
    ///
    /// Ignores the Gibbs energy and iterates on the mass balance only, leaving in `state.n` a
    /// strictly positive point with `W n ≈ b`. The multipliers are reset so the next solve
    /// derives them from the new amounts.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when `state.n` is neither empty nor of one
    /// entry per species, and the errors of the optimizer for invalid pre-pass options.
    pub fn initialize<M: GibbsModel>(
        &mut self,
        problem: &EquilibriumProblem<M>,
        state: &mut EquilibriumState,
    ) -> EquilibriumSolverResult<OptimumResult> {
        check_guess(problem, state)?;

        let feasibility =
            FeasibilityProblem::new(GibbsOptimumProblem::new(problem, GibbsHessian::Diagonal));
        let mut optimum = OptimumState::new(state.n.clone(), DVector::zeros(0), DVector::zeros(0));
        let result = self.prepass.solve(
            &feasibility,
            &mut optimum,
            &self.options.prepass_options(problem),
        )?;

        if !result.succeeded {
            warn!(
                "Feasibility pre-pass stopped after {} iterations: {}",
                result.iterations, result.status
            );
        }

        state.n = optimum.x;
        state.y = DVector::zeros(0);
        state.z = DVector::zeros(0);
        Ok(result)
    }

    /// Compute the equilibrium state of `problem`, starting from `state`.
    ///
    /// Runs the feasibility pre-pass first when enabled, then the configured backend. The
    /// final amounts and multipliers are written back into `state` whether or not the solve
    /// converged; check [`EquilibriumResult::succeeded`].
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` for a guess of the wrong dimension, and the
    /// errors of the optimizer for invalid options.
    pub fn solve<M: GibbsModel>(
        &mut self,
        problem: &EquilibriumProblem<M>,
        state: &mut EquilibriumState,
    ) -> EquilibriumSolverResult<EquilibriumResult> {
        check_guess(problem, state)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            self.options.print_configuration();
        }

        let feasibility = if self.options.feasibility_prepass {
            Some(self.initialize(problem, state)?)
        } else {
            None
        };

        let gibbs = GibbsOptimumProblem::new(problem, self.options.hessian);
        let mut optimum = state.to_optimum_state();
        let result = self.backend.solve(
            &gibbs,
            &mut optimum,
            &self.options.main_options(problem),
        )?;
        state.update_from(optimum);

        debug!(
            "Equilibrium solve finished: {} after {} iterations (error {:.3e})",
            result.status, result.iterations, result.error
        );

        Ok(EquilibriumResult {
            optimum: result,
            feasibility,
        })
    }

    /// Solve independent problems, one solver instance per problem.
    ///
    /// With the `parallel` feature the problems are distributed over the rayon thread pool;
    /// otherwise they are solved in order. Each entry of the returned vector is the outcome of
    /// the problem at the same index.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when `problems` and `states` differ in
    /// length.
    pub fn solve_batch<M: GibbsModel + Sync>(
        problems: &[EquilibriumProblem<M>],
        states: &mut [EquilibriumState],
        options: &EquilibriumOptions,
    ) -> EquilibriumSolverResult<Vec<EquilibriumSolverResult<EquilibriumResult>>> {
        if problems.len() != states.len() {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "batch states".to_string(),
                expected: problems.len(),
                actual: states.len(),
            }
            .log()
            .into());
        }

        #[cfg(feature = "parallel")]
        let results = problems
            .par_iter()
            .zip(states.par_iter_mut())
            .map(|(problem, state)| EquilibriumSolver::new(options.clone()).solve(problem, state))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results = problems
            .iter()
            .zip(states.iter_mut())
            .map(|(problem, state)| EquilibriumSolver::new(options.clone()).solve(problem, state))
            .collect();

        Ok(results)
    }
}

fn check_guess<M: GibbsModel>(
    problem: &EquilibriumProblem<M>,
    state: &EquilibriumState,
) -> Result<(), EquilibriumError> {
    if !state.n.is_empty() && state.n.len() != problem.num_species() {
        return Err(EquilibriumError::InconsistentDimensions {
            what: "initial species amounts".to_string(),
            expected: problem.num_species(),
            actual: state.n.len(),
        }
        .log());
    }
    Ok(())
}
