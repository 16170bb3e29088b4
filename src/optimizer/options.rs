//! Configuration of a single optimization run.

use crate::core::problem::HessianScheme;
use crate::linalg::KktStrategy;
use crate::optimizer::{OptimizerError, OptimizerResult};
use tracing::debug;

/// Labels used by the diagnostic trace.
///
/// When names are absent for a block, columns are labelled `prefix[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    /// Emit the trace through `tracing::info!`
    pub active: bool,
    pub x_prefix: String,
    pub y_prefix: String,
    pub z_prefix: String,
    pub x_names: Vec<String>,
    pub y_names: Vec<String>,
    pub z_names: Vec<String>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            active: false,
            x_prefix: "x".to_string(),
            y_prefix: "y".to_string(),
            z_prefix: "z".to_string(),
            x_names: Vec::new(),
            y_names: Vec::new(),
            z_names: Vec::new(),
        }
    }
}

impl OutputOptions {
    /// Active output with default labels
    pub fn active() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    pub fn with_x_names(mut self, names: Vec<String>) -> Self {
        self.x_names = names;
        self
    }

    pub fn with_y_names(mut self, names: Vec<String>) -> Self {
        self.y_names = names;
        self
    }

    pub fn with_z_names(mut self, names: Vec<String>) -> Self {
        self.z_names = names;
        self
    }

    /// Column labels for a block of `len` entries
    pub(crate) fn labels(prefix: &str, names: &[String], len: usize) -> Vec<String> {
        (0..len)
            .map(|i| match names.get(i) {
                Some(name) => format!("{prefix}[{name}]"),
                None => format!("{prefix}[{i}]"),
            })
            .collect()
    }
}

/// Line search parameters of the [`IpOpt`](crate::optimizer::IpOpt) backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IpOptParams {
    /// Sufficient decrease constant of the Armijo condition
    pub armijo: f64,
    /// Step shrink factor per backtrack
    pub backtrack_factor: f64,
    pub max_backtracks: usize,
}

impl Default for IpOptParams {
    fn default() -> Self {
        Self {
            armijo: 1e-4,
            backtrack_factor: 0.5,
            max_backtracks: 30,
        }
    }
}

/// Options of the interior-point backends.
///
/// # Builder Pattern
///
/// ```
/// use equilibrium_solver::{HessianScheme, KktStrategy, OptimumOptions};
///
/// let options = OptimumOptions::new()
///     .with_tolerance(1e-8)
///     .with_max_iterations(200)
///     .with_mu(1e-12)
///     .with_hessian_scheme(HessianScheme::Diagonal)
///     .with_kkt_strategy(KktStrategy::Rangespace);
/// assert!(options.validate().is_ok());
/// ```
///
/// The barrier parameter `mu` is held fixed for the whole run. Callers that want a
/// continuation schedule solve repeatedly with decreasing `mu`, reusing the final state.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimumOptions {
    /// Convergence threshold on the largest residual norm
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Barrier parameter, the target of every complementarity product `x_i z_i`
    pub mu: f64,
    /// Initial interior margin: `x` is clipped to at least `mux * mu`
    pub mux: f64,
    /// Fraction-to-the-boundary factor in (0, 1)
    pub tau: f64,
    pub hessian_scheme: HessianScheme,
    pub kkt_strategy: KktStrategy,
    /// Apply `min(alpha_x, alpha_z)` to every block instead of per-block step lengths
    pub uniform_newton_step: bool,
    pub output: OutputOptions,
    pub ipopt: IpOptParams,
}

impl Default for OptimumOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
            mu: 1e-20,
            mux: 1e-5,
            tau: 0.99,
            hessian_scheme: HessianScheme::Exact,
            kkt_strategy: KktStrategy::Fullspace,
            uniform_newton_step: false,
            output: OutputOptions::default(),
            ipopt: IpOptParams::default(),
        }
    }
}

impl OptimumOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    pub fn with_mux(mut self, mux: f64) -> Self {
        self.mux = mux;
        self
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    pub fn with_hessian_scheme(mut self, scheme: HessianScheme) -> Self {
        self.hessian_scheme = scheme;
        self
    }

    pub fn with_kkt_strategy(mut self, strategy: KktStrategy) -> Self {
        self.kkt_strategy = strategy;
        self
    }

    pub fn with_uniform_newton_step(mut self, uniform: bool) -> Self {
        self.uniform_newton_step = uniform;
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    pub fn with_ipopt_params(mut self, params: IpOptParams) -> Self {
        self.ipopt = params;
        self
    }

    /// Check parameter ranges
    ///
    /// # Errors
    /// `OptimizerError::InvalidParameters` naming the first offending parameter.
    pub fn validate(&self) -> OptimizerResult<()> {
        let invalid = |msg: String| Err(OptimizerError::InvalidParameters(msg).log());

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return invalid(format!("mu must be positive, got {}", self.mu));
        }
        if !(self.mux.is_finite() && self.mux > 0.0) {
            return invalid(format!("mux must be positive, got {}", self.mux));
        }
        if !(self.tau > 0.0 && self.tau < 1.0) {
            return invalid(format!("tau must lie in (0, 1), got {}", self.tau));
        }
        let ls = &self.ipopt;
        if !(ls.backtrack_factor > 0.0 && ls.backtrack_factor < 1.0) {
            return invalid(format!(
                "backtrack factor must lie in (0, 1), got {}",
                ls.backtrack_factor
            ));
        }
        if !(ls.armijo > 0.0 && ls.armijo < 1.0) {
            return invalid(format!("armijo constant must lie in (0, 1), got {}", ls.armijo));
        }
        Ok(())
    }

    /// Print configuration parameters (debug level only)
    pub fn print_configuration(&self) {
        debug!(
            "Configuration:\n  Hessian scheme:  {}\n  KKT strategy:    {}\n  Convergence Criteria:\n  Max iterations:  {}\n  Tolerance:       {:.2e}\n  Barrier:\n  mu:              {:.2e}\n  mux:             {:.2e}\n  tau:             {:.2}\n  Step update:     {}",
            self.hessian_scheme,
            self.kkt_strategy,
            self.max_iterations,
            self.tolerance,
            self.mu,
            self.mux,
            self.tau,
            if self.uniform_newton_step {
                "uniform"
            } else {
                "per block"
            }
        );
    }
}
