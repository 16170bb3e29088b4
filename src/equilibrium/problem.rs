//! Equilibrium formulation and its mapping onto [`OptimumProblem`].

use crate::core::problem::{Hessian, OptimumProblem};
use crate::equilibrium::{EquilibriumError, GibbsHessian, GibbsModel};
use crate::linalg::nullspace::matrix_rank;
use nalgebra::{DMatrix, DVector};

/// Gibbs energy minimization under elemental mass balance.
///
/// `formula_matrix[(j, i)]` is the number of atoms of element `j` in species `i`, and
/// `element_amounts[j]` the total amount of element `j` in the system.
#[derive(Debug, Clone)]
pub struct EquilibriumProblem<M> {
    model: M,
    formula_matrix: DMatrix<f64>,
    element_amounts: DVector<f64>,
    species_names: Vec<String>,
    element_names: Vec<String>,
}

impl<M: GibbsModel> EquilibriumProblem<M> {
    /// Validate and assemble an equilibrium problem.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when the formula matrix does not have one
    /// column per species or one row per element amount, `EquilibriumError::InvalidInput` for
    /// a system without species or with non-finite entries, and
    /// `EquilibriumError::RedundantElements` when the element rows are linearly dependent
    /// (for example an element no species contains). Such a mass balance makes every KKT
    /// system of the solve singular.
    pub fn new(
        model: M,
        formula_matrix: DMatrix<f64>,
        element_amounts: DVector<f64>,
    ) -> Result<Self, EquilibriumError> {
        let species = model.num_species();
        if species == 0 {
            return Err(EquilibriumError::InvalidInput("system without species".to_string()).log());
        }
        if formula_matrix.ncols() != species {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "formula matrix columns".to_string(),
                expected: species,
                actual: formula_matrix.ncols(),
            }
            .log());
        }
        if element_amounts.len() != formula_matrix.nrows() {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "element amounts".to_string(),
                expected: formula_matrix.nrows(),
                actual: element_amounts.len(),
            }
            .log());
        }
        if formula_matrix.iter().chain(element_amounts.iter()).any(|v| !v.is_finite()) {
            return Err(EquilibriumError::InvalidInput(
                "formula matrix and element amounts must be finite".to_string(),
            )
            .log());
        }
        let rank = matrix_rank(&formula_matrix);
        if rank < formula_matrix.nrows() {
            return Err(EquilibriumError::RedundantElements {
                rank,
                elements: formula_matrix.nrows(),
            }
            .log());
        }

        Ok(Self {
            model,
            formula_matrix,
            element_amounts,
            species_names: Vec::new(),
            element_names: Vec::new(),
        })
    }

    /// Attach species names, used as labels of the diagnostic trace.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when there is not one name per species.
    pub fn with_species_names(mut self, names: Vec<String>) -> Result<Self, EquilibriumError> {
        if names.len() != self.num_species() {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "species names".to_string(),
                expected: self.num_species(),
                actual: names.len(),
            }
            .log());
        }
        self.species_names = names;
        Ok(self)
    }

    /// Attach element names, used as labels of the diagnostic trace.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when there is not one name per element.
    pub fn with_element_names(mut self, names: Vec<String>) -> Result<Self, EquilibriumError> {
        if names.len() != self.num_elements() {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "element names".to_string(),
                expected: self.num_elements(),
                actual: names.len(),
            }
            .log());
        }
        self.element_names = names;
        Ok(self)
    }

    /// Same system with different element amounts.
    ///
    /// # Errors
    /// `EquilibriumError::InconsistentDimensions` when `element_amounts` has the wrong length.
    pub fn with_element_amounts(
        &self,
        element_amounts: DVector<f64>,
    ) -> Result<Self, EquilibriumError>
    where
        M: Clone,
    {
        let problem = Self::new(
            self.model.clone(),
            self.formula_matrix.clone(),
            element_amounts,
        )?;
        Ok(Self {
            species_names: self.species_names.clone(),
            element_names: self.element_names.clone(),
            ..problem
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn formula_matrix(&self) -> &DMatrix<f64> {
        &self.formula_matrix
    }

    pub fn element_amounts(&self) -> &DVector<f64> {
        &self.element_amounts
    }

    pub fn species_names(&self) -> &[String] {
        &self.species_names
    }

    pub fn element_names(&self) -> &[String] {
        &self.element_names
    }

    pub fn num_species(&self) -> usize {
        self.formula_matrix.ncols()
    }

    pub fn num_elements(&self) -> usize {
        self.formula_matrix.nrows()
    }

    /// Mass balance residual `W n − b`
    pub fn mass_balance_residual(&self, n: &DVector<f64>) -> DVector<f64> {
        &self.formula_matrix * n - &self.element_amounts
    }
}

/// [`OptimumProblem`] view of an [`EquilibriumProblem`].
///
/// Objective `G(n)/RT`, gradient `μ(n)/RT`, constraints `W n − b` with Jacobian `W`. The
/// Hessian is the full `∂μ/∂n` or the model's diagonal approximation depending on `hessian`.
pub struct GibbsOptimumProblem<'a, M> {
    problem: &'a EquilibriumProblem<M>,
    hessian: GibbsHessian,
}

impl<'a, M: GibbsModel> GibbsOptimumProblem<'a, M> {
    pub fn new(problem: &'a EquilibriumProblem<M>, hessian: GibbsHessian) -> Self {
        Self { problem, hessian }
    }
}

impl<M: GibbsModel> OptimumProblem for GibbsOptimumProblem<'_, M> {
    fn num_variables(&self) -> usize {
        self.problem.num_species()
    }

    fn num_constraints(&self) -> usize {
        self.problem.num_elements()
    }

    fn objective(&self, x: &DVector<f64>) -> f64 {
        self.problem.model.gibbs_energy(x)
    }

    fn objective_gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        self.problem.model.chemical_potentials(x)
    }

    fn objective_hessian(&self, x: &DVector<f64>, _gradient: &DVector<f64>) -> Hessian {
        match self.hessian {
            GibbsHessian::Exact => {
                Hessian::Dense(self.problem.model.chemical_potentials_derivatives(x))
            }
            GibbsHessian::Diagonal => {
                Hessian::Diagonal(self.problem.model.chemical_potentials_diagonal(x))
            }
        }
    }

    fn constraint(&self, x: &DVector<f64>) -> DVector<f64> {
        self.problem.mass_balance_residual(x)
    }

    fn constraint_jacobian(&self, _x: &DVector<f64>) -> DMatrix<f64> {
        self.problem.formula_matrix.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::IdealMixture;
    use nalgebra::{dmatrix, dvector};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn water() -> Result<EquilibriumProblem<IdealMixture>, EquilibriumError> {
        EquilibriumProblem::new(
            IdealMixture::single_phase(dvector![0.0, 0.0, -10.0]),
            dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0],
            dvector![4.0, 2.0],
        )
    }

    #[test]
    fn test_dimensions_are_validated() {
        let model = IdealMixture::single_phase(dvector![0.0, 0.0, -10.0]);

        let wrong_columns = EquilibriumProblem::new(
            model.clone(),
            dmatrix![2.0, 0.0; 0.0, 2.0],
            dvector![4.0, 2.0],
        );
        assert!(matches!(
            wrong_columns,
            Err(EquilibriumError::InconsistentDimensions { expected: 3, actual: 2, .. })
        ));

        let wrong_amounts = EquilibriumProblem::new(
            model.clone(),
            dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0],
            dvector![4.0],
        );
        assert!(matches!(
            wrong_amounts,
            Err(EquilibriumError::InconsistentDimensions { expected: 2, actual: 1, .. })
        ));

        let not_finite = EquilibriumProblem::new(
            model,
            dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0],
            dvector![4.0, f64::INFINITY],
        );
        assert!(matches!(not_finite, Err(EquilibriumError::InvalidInput(_))));
    }

    #[test]
    fn test_redundant_element_rows_are_rejected() {
        let model = IdealMixture::single_phase(dvector![0.0, 0.0, -10.0]);

        // Third element appears in no species
        let absent_element = EquilibriumProblem::new(
            model.clone(),
            dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0; 0.0, 0.0, 0.0],
            dvector![4.0, 2.0, 0.0],
        );
        assert!(matches!(
            absent_element,
            Err(EquilibriumError::RedundantElements { rank: 2, elements: 3 })
        ));

        // Third row is the sum of the first two
        let combined = EquilibriumProblem::new(
            model,
            dmatrix![2.0, 0.0, 2.0; 0.0, 2.0, 1.0; 2.0, 2.0, 3.0],
            dvector![4.0, 2.0, 6.0],
        );
        assert!(matches!(
            combined,
            Err(EquilibriumError::RedundantElements { rank: 2, elements: 3 })
        ));

        // More elements than species
        let single = IdealMixture::single_phase(dvector![-1.0]);
        let overdetermined = EquilibriumProblem::new(single, dmatrix![1.0; 2.0], dvector![1.0, 2.0]);
        assert!(matches!(
            overdetermined,
            Err(EquilibriumError::RedundantElements { rank: 1, elements: 2 })
        ));
    }

    #[test]
    fn test_names_are_validated() -> TestResult {
        let problem = water()?
            .with_species_names(vec!["H2".into(), "O2".into(), "H2O".into()])?
            .with_element_names(vec!["H".into(), "O".into()])?;
        assert_eq!(problem.species_names()[2], "H2O");
        assert_eq!(problem.element_names(), &["H".to_string(), "O".to_string()]);

        assert!(water()?.with_element_names(vec!["H".into()]).is_err());
        Ok(())
    }

    #[test]
    fn test_optimum_problem_mapping() -> TestResult {
        let problem = water()?;
        let n = dvector![1.0, 0.5, 1.0];

        let exact = GibbsOptimumProblem::new(&problem, GibbsHessian::Exact);
        assert_eq!(exact.num_variables(), 3);
        assert_eq!(exact.num_constraints(), 2);
        assert_eq!(exact.constraint(&n), dvector![0.0, 0.0]);
        assert_eq!(exact.constraint_jacobian(&n), *problem.formula_matrix());
        assert_eq!(exact.objective(&n), problem.model().gibbs_energy(&n));
        assert_eq!(exact.objective_gradient(&n), problem.model().chemical_potentials(&n));

        let g = exact.objective_gradient(&n);
        assert!(!exact.objective_hessian(&n, &g).is_diagonal());

        let diagonal = GibbsOptimumProblem::new(&problem, GibbsHessian::Diagonal);
        assert_eq!(
            diagonal.objective_hessian(&n, &g),
            Hessian::Diagonal(dvector![1.0, 2.0, 1.0])
        );
        Ok(())
    }

    #[test]
    fn test_with_element_amounts_keeps_system() -> TestResult {
        let problem = water()?.with_species_names(vec!["H2".into(), "O2".into(), "H2O".into()])?;
        let richer = problem.with_element_amounts(dvector![6.0, 2.0])?;
        assert_eq!(richer.element_amounts(), &dvector![6.0, 2.0]);
        assert_eq!(richer.species_names(), problem.species_names());
        assert_eq!(
            richer.mass_balance_residual(&dvector![1.0, 0.0, 2.0]),
            dvector![0.0, 0.0]
        );
        assert!(problem.with_element_amounts(dvector![1.0]).is_err());
        Ok(())
    }
}
