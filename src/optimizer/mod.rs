//! Interior-point optimization backends.
//!
//! Both backends minimize an [`OptimumProblem`] over `x > 0` with a fixed barrier
//! parameter, sharing the steps defined in this module:
//! - [`initialize_state`]: default mismatched vectors and clip the guess into the interior
//! - [`evaluate`]: refresh the cached `f`, `g`, `h`, `A`
//! - [`assemble_hessian`]: Hessian in the configured representation
//! - [`compute_residuals`]: right-hand side of the KKT system
//! - [`step_lengths`] / [`apply_step`]: fraction-to-the-boundary safeguard and update
//! - [`compute_errors`]: optimality residual norms
//!
//! Evaluation counting, residual norms, trace output, observer notification and timing of the
//! iteration loop are kept by a `SolveMonitor` shared by both backends.
//!
//! Backends:
//! - [`IpNewton`]: full Newton steps truncated by the fraction-to-the-boundary rule
//! - [`IpOpt`]: the same direction with a backtracking line search on a barrier merit function

use crate::core::{
    CoreError,
    problem::{Hessian, HessianScheme, OptimumProblem},
    result::ErrorNorms,
    state::OptimumState,
};
use crate::linalg::{self, KktSolution, KktVector};
use crate::observers::IterationMetrics;
use nalgebra::DVector;
use output::TraceOutput;
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::{debug, error, warn};
use web_time::{Duration, Instant};

pub mod ipnewton;
pub mod ipopt;
pub mod options;
pub mod output;

pub use ipnewton::IpNewton;
pub use ipopt::IpOpt;
pub use options::{IpOptParams, OptimumOptions, OutputOptions};

// Re-export observer and result types used by every backend
pub use crate::core::result::{OptimizationStatus, OptimumResult};
pub use crate::observers::{OptObserver, OptObserverVec};

/// Optimization backend
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerType {
    /// Interior-point Newton method
    #[default]
    IpNewton,
    /// Interior-point method with merit-function line search
    IpOpt,
}

impl Display for OptimizerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerType::IpNewton => write!(f, "IpNewton"),
            OptimizerType::IpOpt => write!(f, "IpOpt"),
        }
    }
}

/// Optimizer-specific error types
///
/// Only misconfiguration and contract violations are errors. Iteration budget exhaustion,
/// non-finite evaluations and failed Newton directions are reported through
/// [`OptimumResult::status`].
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Invalid optimization parameters provided
    #[error("Invalid optimization parameters: {0}")]
    InvalidParameters(String),

    /// Problem evaluation violated its dimension contract
    #[error("Problem evaluation failed: {0}")]
    Core(#[from] CoreError),

    /// Linear algebra operation failed
    #[error("Linear algebra error: {0}")]
    LinAlg(#[from] linalg::LinAlgError),
}

impl OptimizerError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// operation()
    ///     .map_err(|e| OptimizerError::from(e).log())?;
    /// ```
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

/// Result type for optimizer operations
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Core trait of the optimization backends.
pub trait Solver: Send {
    /// Minimize `problem` starting from `state`, leaving the final iterate in `state`.
    ///
    /// # Errors
    /// `OptimizerError` for invalid options or evaluations of the wrong dimension. Numerical
    /// aborts inside the loop return `Ok` with `succeeded == false`.
    fn solve(
        &mut self,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
    ) -> OptimizerResult<OptimumResult>;

    /// Observers notified by this backend
    fn observers_mut(&mut self) -> &mut OptObserverVec;
}

/// Create the backend for `optimizer`
pub fn create_solver(optimizer: OptimizerType) -> Box<dyn Solver> {
    match optimizer {
        OptimizerType::IpNewton => Box::new(IpNewton::new()),
        OptimizerType::IpOpt => Box::new(IpOpt::new()),
    }
}

/// Step lengths of one Newton update
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StepLengths {
    /// `min(alpha_x, alpha_z)`
    pub alpha: f64,
    pub alpha_x: f64,
    pub alpha_z: f64,
}

/// Largest step in `(0, 1]` keeping `v + alpha·dv ≥ (1 − tau)·v`.
///
/// ```
/// use equilibrium_solver::optimizer::fraction_to_boundary;
/// use nalgebra::dvector;
///
/// let alpha = fraction_to_boundary(&dvector![1.0, 2.0], &dvector![-4.0, 1.0], 0.99);
/// assert!((alpha - 0.2475).abs() < 1e-15);
/// ```
pub fn fraction_to_boundary(v: &DVector<f64>, dv: &DVector<f64>, tau: f64) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, d)| **d < 0.0)
        .fold(1.0, |alpha: f64, (vi, di)| alpha.min(-tau * vi / di))
}

/// Prepare the initial iterate.
///
/// Vectors of the wrong dimension are replaced by zeros, `x` is clipped to at least
/// `mux·mu` and every non-positive bound multiplier is set to `mu / x_i`.
pub fn initialize_state(
    problem: &dyn OptimumProblem,
    state: &mut OptimumState,
    options: &OptimumOptions,
) {
    let n = problem.num_variables();
    let m = problem.num_constraints();

    if state.x.len() != n {
        state.x = DVector::zeros(n);
    }
    if state.y.len() != m {
        state.y = DVector::zeros(m);
    }
    if state.z.len() != n {
        state.z = DVector::zeros(n);
    }

    let lower = options.mux * options.mu;
    state.x.apply(|xi| *xi = xi.max(lower));
    for (zi, xi) in state.z.iter_mut().zip(state.x.iter()) {
        if *zi <= 0.0 || zi.is_nan() {
            *zi = options.mu / xi;
        }
    }
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<(), CoreError> {
    if actual != expected {
        return Err(CoreError::DimensionMismatch(format!(
            "{what} has {actual} entries, expected {expected}"
        ))
        .log());
    }
    Ok(())
}

/// Evaluate `f`, `g`, `h` and `A` at `state.x` and cache them.
///
/// Returns `false` when any evaluated value is NaN or infinite.
///
/// # Errors
/// `CoreError::DimensionMismatch` when an evaluation has the wrong shape.
pub fn evaluate(
    problem: &dyn OptimumProblem,
    state: &mut OptimumState,
) -> Result<bool, CoreError> {
    let n = problem.num_variables();
    let m = problem.num_constraints();

    state.f = problem.objective(&state.x);
    state.g = problem.objective_gradient(&state.x);
    state.h = problem.constraint(&state.x);
    state.a = problem.constraint_jacobian(&state.x);

    check_len("objective gradient", state.g.len(), n)?;
    check_len("constraint residual", state.h.len(), m)?;
    if state.a.shape() != (m, n) {
        return Err(CoreError::DimensionMismatch(format!(
            "constraint Jacobian is {}x{}, expected {}x{}",
            state.a.nrows(),
            state.a.ncols(),
            m,
            n
        ))
        .log());
    }

    Ok(state.f.is_finite()
        && state.g.iter().all(|v| v.is_finite())
        && state.h.iter().all(|v| v.is_finite())
        && state.a.iter().all(|v| v.is_finite()))
}

/// Evaluate the objective Hessian and convert it to `scheme`.
///
/// # Errors
/// `CoreError::DimensionMismatch` when the Hessian is not n × n.
pub fn assemble_hessian(
    problem: &dyn OptimumProblem,
    state: &OptimumState,
    scheme: HessianScheme,
) -> Result<Hessian, CoreError> {
    let hessian = problem.objective_hessian(&state.x, &state.g);
    let n = problem.num_variables();
    let square = match &hessian {
        Hessian::Dense(h) => h.shape() == (n, n),
        Hessian::Diagonal(d) => d.len() == n,
    };
    if !square {
        return Err(CoreError::DimensionMismatch(format!(
            "objective Hessian has dimension {}, expected {}",
            hessian.dim(),
            n
        ))
        .log());
    }
    Ok(hessian.into_scheme(scheme))
}

/// Stationarity residual `g − Aᵀy − z`
fn stationarity(state: &OptimumState) -> DVector<f64> {
    &state.g - state.a.transpose() * &state.y - &state.z
}

/// Centering residual `x∘z − mu`
fn centering(state: &OptimumState, mu: f64) -> DVector<f64> {
    state.x.component_mul(&state.z).add_scalar(-mu)
}

/// Right-hand side `(-(g − Aᵀy − z), -h, -(x∘z − mu))` of the KKT system
pub fn compute_residuals(state: &OptimumState, mu: f64) -> KktVector {
    KktVector {
        rx: -stationarity(state),
        ry: -&state.h,
        rz: -centering(state, mu),
    }
}

/// Infinity norms of the stationarity, feasibility and centering residuals
pub fn compute_errors(state: &OptimumState, mu: f64) -> ErrorNorms {
    ErrorNorms {
        stationarity: stationarity(state).amax(),
        feasibility: state.h.amax(),
        centering: centering(state, mu).amax(),
    }
}

/// Fraction-to-the-boundary step lengths for `x` and `z`
pub fn step_lengths(state: &OptimumState, solution: &KktSolution, tau: f64) -> StepLengths {
    let alpha_x = fraction_to_boundary(&state.x, &solution.dx, tau);
    let alpha_z = fraction_to_boundary(&state.z, &solution.dz, tau);
    StepLengths {
        alpha: alpha_x.min(alpha_z),
        alpha_x,
        alpha_z,
    }
}

/// Update the iterate along `solution`.
///
/// In uniform mode `steps.alpha` scales all three blocks. Otherwise `x` moves by
/// `steps.alpha_x`, `y` takes the full step and `z` moves by `steps.alpha_z`.
pub fn apply_step(
    state: &mut OptimumState,
    solution: &KktSolution,
    steps: &StepLengths,
    uniform: bool,
) {
    if uniform {
        state.x.axpy(steps.alpha, &solution.dx, 1.0);
        state.y.axpy(steps.alpha, &solution.dy, 1.0);
        state.z.axpy(steps.alpha, &solution.dz, 1.0);
    } else {
        state.x.axpy(steps.alpha_x, &solution.dx, 1.0);
        state.y += &solution.dy;
        state.z.axpy(steps.alpha_z, &solution.dz, 1.0);
    }
}

/// Bookkeeping of one solve, common to every backend.
///
/// The loop of a backend reads
///
/// ```text
/// let mut monitor = SolveMonitor::begin(..)?;
/// let status = loop {
///     if let Some(status) = monitor.next_iteration(options) { break status; }
///     // compute and apply the step
///     if let Some(status) = monitor.end_iteration(..)? { break status; }
/// };
/// Ok(monitor.finish(status))
/// ```
pub(crate) struct SolveMonitor {
    name: &'static str,
    output: TraceOutput,
    start_time: Instant,
    iter_start: Instant,
    /// Time spent factoring and solving KKT systems
    pub linear_time: Duration,
    pub result: OptimumResult,
    /// Whether the last evaluation was finite
    finite: bool,
}

impl SolveMonitor {
    /// Validate `options`, initialize `state` and evaluate the problem at the initial iterate.
    ///
    /// # Errors
    /// `OptimizerError::InvalidParameters` for invalid options and `OptimizerError::Core`
    /// when the evaluation has the wrong dimension.
    pub fn begin(
        name: &'static str,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
    ) -> OptimizerResult<Self> {
        options.validate()?;

        let start_time = Instant::now();
        initialize_state(problem, state, options);
        let output = TraceOutput::new(
            &options.output,
            problem.num_variables(),
            problem.num_constraints(),
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            options.print_configuration();
            IterationStats::print_header();
        }

        let mut result = OptimumResult::default();
        let finite = evaluate(problem, state)?;
        result.function_evaluations += 1;
        if finite {
            result.errors = compute_errors(state, options.mu);
            result.error = result.errors.max();
        }

        output.header();
        output.initial_row(state);

        Ok(Self {
            name,
            output,
            start_time,
            iter_start: start_time,
            linear_time: Duration::ZERO,
            result,
            finite,
        })
    }

    /// Count a new iteration, or return the status to stop with.
    pub fn next_iteration(&mut self, options: &OptimumOptions) -> Option<OptimizationStatus> {
        if !self.finite {
            return Some(OptimizationStatus::InvalidNumericalValues);
        }
        self.result.iterations += 1;
        if self.result.iterations > options.max_iterations {
            return Some(OptimizationStatus::MaxIterationsReached);
        }
        self.iter_start = Instant::now();
        None
    }

    /// Re-evaluate after a step, report the iteration and check convergence.
    ///
    /// Returns the status to stop with, if any.
    ///
    /// # Errors
    /// `OptimizerError::Core` when the evaluation has the wrong dimension.
    pub fn end_iteration(
        &mut self,
        problem: &dyn OptimumProblem,
        state: &mut OptimumState,
        options: &OptimumOptions,
        steps: &StepLengths,
        observers: &OptObserverVec,
    ) -> OptimizerResult<Option<OptimizationStatus>> {
        self.finite = evaluate(problem, state)?;
        self.result.function_evaluations += 1;
        if !self.finite {
            return Ok(Some(OptimizationStatus::InvalidNumericalValues));
        }

        let result = &mut self.result;
        result.errors = compute_errors(state, options.mu);
        result.error = result.errors.max();

        self.output.row(result.iterations, state, &result.errors, steps);
        if tracing::enabled!(tracing::Level::DEBUG) {
            IterationStats {
                iteration: result.iterations,
                objective: state.f,
                errors: result.errors,
                steps: *steps,
                iter_time_ms: self.iter_start.elapsed().as_secs_f64() * 1000.0,
                total_time_ms: self.start_time.elapsed().as_secs_f64() * 1000.0,
            }
            .print_line();
        }

        if !observers.is_empty() {
            observers.set_iteration_metrics(&IterationMetrics {
                objective: state.f,
                errors: result.errors,
                alpha_x: steps.alpha_x,
                alpha_z: steps.alpha_z,
                alpha: steps.alpha,
            });
            observers.notify(state, result.iterations);
        }

        Ok((result.error < options.tolerance).then_some(OptimizationStatus::Converged))
    }

    /// Close the trace and stamp status and timings on the result.
    pub fn finish(self, status: OptimizationStatus) -> OptimumResult {
        self.output.header();

        let mut result = self.result;
        result.finish(status);
        result.time = self.start_time.elapsed();
        result.time_linear_systems = self.linear_time;

        if !result.succeeded {
            warn!(
                "{} stopped without convergence: {} after {} iterations (error {:.3e})",
                self.name, result.status, result.iterations, result.error
            );
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!("{}", result);
        }
        result
    }
}

/// Per-iteration statistics for the debug table
#[derive(Debug, Clone)]
pub(crate) struct IterationStats {
    pub iteration: usize,
    pub objective: f64,
    pub errors: ErrorNorms,
    pub steps: StepLengths,
    pub iter_time_ms: f64,
    pub total_time_ms: f64,
}

impl IterationStats {
    pub fn print_header() {
        debug!(
            "{:>4}  {:>13}  {:>11}  {:>11}  {:>11}  {:>11}  {:>9}  {:>9}  {:>11}  {:>13}",
            "iter",
            "objective",
            "error",
            "errorf",
            "errorh",
            "errorc",
            "alpha_x",
            "alpha_z",
            "iter_time",
            "total_time"
        );
    }

    pub fn print_line(&self) {
        debug!(
            "{:>4}  {:>13.6e}  {:>11.2e}  {:>11.2e}  {:>11.2e}  {:>11.2e}  {:>9.3}  {:>9.3}  {:>9.2}ms  {:>11.2}ms",
            self.iteration,
            self.objective,
            self.errors.max(),
            self.errors.stationarity,
            self.errors.feasibility,
            self.errors.centering,
            self.steps.alpha_x,
            self.steps.alpha_z,
            self.iter_time_ms,
            self.total_time_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, dmatrix, dvector};

    const TOLERANCE: f64 = 1e-12;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// minimize (x1 - 1)² + (x2 - 2)² subject to x1 + x2 = 3
    struct Shifted;

    impl OptimumProblem for Shifted {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn objective(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2)
        }
        fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> {
            dvector![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)]
        }
        fn objective_hessian(&self, _x: &DVector<f64>, _g: &DVector<f64>) -> Hessian {
            Hessian::Dense(dmatrix![2.0, 0.0; 0.0, 2.0])
        }
        fn constraint(&self, x: &DVector<f64>) -> DVector<f64> {
            dvector![x[0] + x[1] - 3.0]
        }
        fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            dmatrix![1.0, 1.0]
        }
    }

    /// Returns a gradient with the wrong length
    struct BrokenGradient;

    impl OptimumProblem for BrokenGradient {
        fn num_variables(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            0
        }
        fn objective(&self, _x: &DVector<f64>) -> f64 {
            0.0
        }
        fn objective_gradient(&self, _x: &DVector<f64>) -> DVector<f64> {
            dvector![1.0, 2.0, 3.0]
        }
        fn objective_hessian(&self, _x: &DVector<f64>, _g: &DVector<f64>) -> Hessian {
            Hessian::Diagonal(dvector![1.0])
        }
        fn constraint(&self, _x: &DVector<f64>) -> DVector<f64> {
            DVector::zeros(0)
        }
        fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::zeros(0, 2)
        }
    }

    #[test]
    fn test_fraction_to_boundary() {
        let v = dvector![1.0, 2.0, 3.0];

        // No decreasing component: full step
        assert_eq!(fraction_to_boundary(&v, &dvector![1.0, 0.0, 5.0], 0.99), 1.0);

        // Binding component 2: -0.99 * 2 / -4 = 0.495
        let alpha = fraction_to_boundary(&v, &dvector![-0.5, -4.0, 1.0], 0.99);
        assert!((alpha - 0.495).abs() < TOLERANCE);

        // Decrease small enough that the unit step is safe
        assert_eq!(fraction_to_boundary(&v, &dvector![-0.1, 0.0, 0.0], 0.99), 1.0);
    }

    #[test]
    fn test_initialize_defaults_and_clips() {
        let options = OptimumOptions::new().with_mu(1e-4).with_mux(0.5);
        let mut state = OptimumState::new(
            dvector![-1.0, 0.0],
            DVector::zeros(3),
            dvector![2.0, -1.0],
        );

        initialize_state(&Shifted, &mut state, &options);

        assert_eq!(state.y.len(), 1);
        assert_eq!(state.x, dvector![5e-5, 5e-5]);
        assert_eq!(state.z[0], 2.0);
        assert!((state.z[1] - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_initialize_replaces_mismatched_vectors() {
        let options = OptimumOptions::default();
        let mut state = OptimumState::new(
            dvector![1.0, 2.0, 3.0],
            DVector::zeros(0),
            dvector![1.0],
        );

        initialize_state(&Shifted, &mut state, &options);

        let floor = options.mux * options.mu;
        assert_eq!(state.x, dvector![floor, floor]);
        assert_eq!(state.y, dvector![0.0]);
        assert!(state.z.iter().all(|z| (*z - 1e5).abs() < 1e-9));
    }

    #[test]
    fn test_residuals_and_errors() -> TestResult {
        let mut state = OptimumState::new(dvector![1.0, 1.0], dvector![0.5], dvector![0.25, 2.0]);
        assert!(evaluate(&Shifted, &mut state)?);

        // g = (0, -2), h = -1
        let rhs = compute_residuals(&state, 0.5);
        assert!((rhs.rx - dvector![0.75, 4.5]).amax() < TOLERANCE);
        assert!((rhs.ry - dvector![1.0]).amax() < TOLERANCE);
        assert!((rhs.rz - dvector![0.25, -1.5]).amax() < TOLERANCE);

        let errors = compute_errors(&state, 0.5);
        assert!((errors.stationarity - 4.5).abs() < TOLERANCE);
        assert!((errors.feasibility - 1.0).abs() < TOLERANCE);
        assert!((errors.centering - 1.5).abs() < TOLERANCE);
        assert!((errors.max() - 4.5).abs() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_evaluate_detects_dimension_mismatch() {
        let mut state = OptimumState::new(
            dvector![1.0, 1.0],
            DVector::zeros(0),
            dvector![1.0, 1.0],
        );
        assert!(matches!(
            evaluate(&BrokenGradient, &mut state),
            Err(CoreError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_evaluate_flags_non_finite_values() -> TestResult {
        let mut state = OptimumState::new(
            dvector![f64::NAN, 1.0],
            dvector![0.0],
            dvector![1.0, 1.0],
        );
        assert!(!evaluate(&Shifted, &mut state)?);
        Ok(())
    }

    #[test]
    fn test_assemble_hessian_applies_scheme() -> TestResult {
        let state = OptimumState::new(dvector![1.0, 1.0], dvector![0.0], dvector![1.0, 1.0]);
        let hessian = assemble_hessian(&Shifted, &state, HessianScheme::Diagonal)?;
        assert_eq!(hessian, Hessian::Diagonal(dvector![2.0, 2.0]));

        let mut broken = OptimumState::new(
            dvector![1.0, 1.0],
            DVector::zeros(0),
            dvector![1.0, 1.0],
        );
        broken.g = dvector![0.0, 0.0];
        assert!(assemble_hessian(&BrokenGradient, &broken, HessianScheme::Exact).is_err());
        Ok(())
    }

    #[test]
    fn test_apply_step_modes() {
        let solution = KktSolution {
            dx: dvector![-2.0, 1.0],
            dy: dvector![3.0],
            dz: dvector![1.0, -0.5],
        };
        let base = OptimumState::new(dvector![1.0, 1.0], dvector![0.0], dvector![1.0, 1.0]);
        let steps = step_lengths(&base, &solution, 0.9);
        assert!((steps.alpha_x - 0.45).abs() < TOLERANCE);
        assert_eq!(steps.alpha_z, 1.0);
        assert!((steps.alpha - 0.45).abs() < TOLERANCE);

        let mut split = base.clone();
        apply_step(&mut split, &solution, &steps, false);
        assert!((split.x[0] - 0.1).abs() < TOLERANCE);
        assert_eq!(split.y[0], 3.0);
        assert_eq!(split.z[1], 0.5);

        let mut uniform = base.clone();
        apply_step(&mut uniform, &solution, &steps, true);
        assert!((uniform.y[0] - 1.35).abs() < TOLERANCE);
        assert!((uniform.z[1] - 0.775).abs() < TOLERANCE);
        assert!(uniform.is_interior());
    }

    #[test]
    fn test_solve_monitor_counts_and_converges() -> TestResult {
        let options = OptimumOptions::new().with_max_iterations(1);
        let mut state = OptimumState::new(dvector![1.0, 2.0], dvector![0.0], dvector![1.0, 1.0]);

        let mut monitor = SolveMonitor::begin("test", &Shifted, &mut state, &options)?;
        assert_eq!(monitor.result.function_evaluations, 1);
        // g = 0, h = 0: stationarity 1, centering 2
        assert!((monitor.result.error - 2.0).abs() < TOLERANCE);
        assert_eq!(monitor.next_iteration(&options), None);

        // The minimizer with centered bound multipliers
        state.z = state.x.map(|xi| options.mu / xi);
        let status = monitor.end_iteration(
            &Shifted,
            &mut state,
            &options,
            &StepLengths::default(),
            &OptObserverVec::new(),
        )?;
        assert_eq!(status, Some(OptimizationStatus::Converged));

        let result = monitor.finish(OptimizationStatus::Converged);
        assert!(result.succeeded);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.function_evaluations, 2);
        assert_eq!(result.time_linear_systems, Duration::ZERO);
        Ok(())
    }

    #[test]
    fn test_solve_monitor_stops_at_budget() -> TestResult {
        let options = OptimumOptions::new().with_max_iterations(1);
        let mut state = OptimumState::new(dvector![1.0, 2.0], dvector![0.0], dvector![1.0, 1.0]);

        let mut monitor = SolveMonitor::begin("test", &Shifted, &mut state, &options)?;
        assert_eq!(monitor.next_iteration(&options), None);
        assert_eq!(
            monitor.next_iteration(&options),
            Some(OptimizationStatus::MaxIterationsReached)
        );

        let result = monitor.finish(OptimizationStatus::MaxIterationsReached);
        assert!(!result.succeeded);
        assert_eq!(result.iterations, 2);
        Ok(())
    }

    #[test]
    fn test_solve_monitor_rejects_invalid_options() {
        let mut state = OptimumState::default();
        let options = OptimumOptions::new().with_mu(-1.0);
        assert!(matches!(
            SolveMonitor::begin("test", &Shifted, &mut state, &options),
            Err(OptimizerError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_optimizer_type_display() {
        assert_eq!(OptimizerType::default().to_string(), "IpNewton");
        assert_eq!(OptimizerType::IpOpt.to_string(), "IpOpt");
    }
}
