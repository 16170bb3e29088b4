//! Configuration of an equilibrium calculation.

use crate::core::problem::HessianScheme;
use crate::equilibrium::{EquilibriumProblem, GibbsHessian, GibbsModel};
use crate::linalg::KktStrategy;
use crate::optimizer::{OptimizerType, options::OptimumOptions};
use tracing::debug;

/// Options of [`EquilibriumSolver`](crate::equilibrium::EquilibriumSolver).
///
/// `hessian` overrides the Hessian scheme and KKT strategy of `optimum`; every other field of
/// `optimum` is used as given.
///
/// ```
/// use equilibrium_solver::{EquilibriumOptions, GibbsHessian, OptimizerType, OptimumOptions};
///
/// let options = EquilibriumOptions::new()
///     .with_hessian(GibbsHessian::Diagonal)
///     .with_algorithm(OptimizerType::IpOpt)
///     .with_feasibility_prepass(true)
///     .with_optimum(OptimumOptions::new().with_tolerance(1e-8));
/// assert!(options.feasibility.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumOptions {
    pub hessian: GibbsHessian,
    /// Backend of the main solve
    pub algorithm: OptimizerType,
    /// Run the feasibility pre-pass before the main solve
    pub feasibility_prepass: bool,
    /// Options of the main solve
    pub optimum: OptimumOptions,
    /// Options of the feasibility pre-pass
    pub feasibility: OptimumOptions,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self {
            hessian: GibbsHessian::default(),
            algorithm: OptimizerType::default(),
            feasibility_prepass: false,
            optimum: OptimumOptions::default(),
            feasibility: OptimumOptions::new()
                .with_mu(1e-8)
                .with_tolerance(1e-6)
                .with_hessian_scheme(HessianScheme::Diagonal)
                .with_kkt_strategy(KktStrategy::Rangespace),
        }
    }
}

impl EquilibriumOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hessian(mut self, hessian: GibbsHessian) -> Self {
        self.hessian = hessian;
        self
    }

    pub fn with_algorithm(mut self, algorithm: OptimizerType) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_feasibility_prepass(mut self, prepass: bool) -> Self {
        self.feasibility_prepass = prepass;
        self
    }

    pub fn with_optimum(mut self, optimum: OptimumOptions) -> Self {
        self.optimum = optimum;
        self
    }

    pub fn with_feasibility(mut self, feasibility: OptimumOptions) -> Self {
        self.feasibility = feasibility;
        self
    }

    /// Options of the main solve for `problem`.
    ///
    /// Applies the Hessian pairing and, when the trace is active, labels unnamed `x`, `z` and
    /// `y` columns with the species and element names of the problem.
    pub fn main_options<M: GibbsModel>(&self, problem: &EquilibriumProblem<M>) -> OptimumOptions {
        let mut options = self
            .optimum
            .clone()
            .with_hessian_scheme(self.hessian.scheme())
            .with_kkt_strategy(self.hessian.kkt_strategy());
        label_output(&mut options, problem);
        options
    }

    /// Options of the feasibility pre-pass for `problem`
    pub fn prepass_options<M: GibbsModel>(
        &self,
        problem: &EquilibriumProblem<M>,
    ) -> OptimumOptions {
        let mut options = self.feasibility.clone();
        label_output(&mut options, problem);
        options
    }

    /// Print configuration parameters (debug level only)
    pub fn print_configuration(&self) {
        debug!(
            "Equilibrium configuration:\n  Hessian:         {}\n  Algorithm:       {}\n  Pre-pass:        {}",
            self.hessian,
            self.algorithm,
            if self.feasibility_prepass { "enabled" } else { "disabled" }
        );
    }
}

fn label_output<M: GibbsModel>(options: &mut OptimumOptions, problem: &EquilibriumProblem<M>) {
    let output = &mut options.output;
    if !output.active {
        return;
    }
    if output.x_names.is_empty() {
        output.x_names = problem.species_names().to_vec();
    }
    if output.z_names.is_empty() {
        output.z_names = problem.species_names().to_vec();
    }
    if output.y_names.is_empty() {
        output.y_names = problem.element_names().to_vec();
    }
}
