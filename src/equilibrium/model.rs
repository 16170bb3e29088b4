//! Thermodynamic models supplying the Gibbs energy and chemical potentials.

use crate::equilibrium::EquilibriumError;
use nalgebra::{DMatrix, DVector};
use std::ops::Range;

/// Thermodynamic model of a chemical system.
///
/// All quantities are dimensionless (divided by `RT`). The model is only evaluated at
/// strictly positive species amounts.
pub trait GibbsModel {
    /// Number of chemical species
    fn num_species(&self) -> usize;

    /// Gibbs energy `G(n)/RT`
    fn gibbs_energy(&self, n: &DVector<f64>) -> f64;

    /// Chemical potentials `μ(n)/RT`, the gradient of [`GibbsModel::gibbs_energy`]
    fn chemical_potentials(&self, n: &DVector<f64>) -> DVector<f64>;

    /// Derivatives `∂μ_i/∂n_j` (species × species)
    fn chemical_potentials_derivatives(&self, n: &DVector<f64>) -> DMatrix<f64>;

    /// Diagonal approximation of `∂μ/∂n`.
    ///
    /// Defaults to the diagonal of [`GibbsModel::chemical_potentials_derivatives`]; models
    /// with a cheaper or better-conditioned approximation should override it.
    fn chemical_potentials_diagonal(&self, n: &DVector<f64>) -> DVector<f64> {
        self.chemical_potentials_derivatives(n).diagonal()
    }
}

impl<M: GibbsModel + ?Sized> GibbsModel for &M {
    fn num_species(&self) -> usize {
        (**self).num_species()
    }

    fn gibbs_energy(&self, n: &DVector<f64>) -> f64 {
        (**self).gibbs_energy(n)
    }

    fn chemical_potentials(&self, n: &DVector<f64>) -> DVector<f64> {
        (**self).chemical_potentials(n)
    }

    fn chemical_potentials_derivatives(&self, n: &DVector<f64>) -> DMatrix<f64> {
        (**self).chemical_potentials_derivatives(n)
    }

    fn chemical_potentials_diagonal(&self, n: &DVector<f64>) -> DVector<f64> {
        (**self).chemical_potentials_diagonal(n)
    }
}

/// Ideal mixture of species grouped into phases.
///
/// Within a phase `p` holding `N_p = Σ_{i∈p} n_i`, species `i` has
/// `μ_i = g0_i + ln(n_i / N_p)` and `∂μ_i/∂n_j = δ_ij / n_i − 1 / N_p`. Species of different
/// phases do not interact. A phase with a single species (a pure condensed phase) has a
/// constant potential `g0_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealMixture {
    standard_potentials: DVector<f64>,
    phases: Vec<Range<usize>>,
}

impl IdealMixture {
    /// Mixture with consecutive species grouped into phases of the given sizes.
    ///
    /// # Errors
    /// `EquilibriumError::InvalidModel` for an empty phase or non-finite standard potentials,
    /// `EquilibriumError::InconsistentDimensions` when the phase sizes do not add up to the
    /// number of species.
    pub fn new(
        standard_potentials: DVector<f64>,
        phase_sizes: &[usize],
    ) -> Result<Self, EquilibriumError> {
        if standard_potentials.iter().any(|g| !g.is_finite()) {
            return Err(EquilibriumError::InvalidModel(
                "standard potentials must be finite".to_string(),
            )
            .log());
        }
        if phase_sizes.contains(&0) {
            return Err(EquilibriumError::InvalidModel("phase without species".to_string()).log());
        }

        let total: usize = phase_sizes.iter().sum();
        if total != standard_potentials.len() {
            return Err(EquilibriumError::InconsistentDimensions {
                what: "phase sizes".to_string(),
                expected: standard_potentials.len(),
                actual: total,
            }
            .log());
        }

        let mut phases = Vec::with_capacity(phase_sizes.len());
        let mut start = 0;
        for size in phase_sizes {
            phases.push(start..start + size);
            start += size;
        }

        Ok(Self {
            standard_potentials,
            phases,
        })
    }

    /// All species in one phase
    pub fn single_phase(standard_potentials: DVector<f64>) -> Self {
        let len = standard_potentials.len();
        Self {
            standard_potentials,
            phases: vec![0..len],
        }
    }

    pub fn standard_potentials(&self) -> &DVector<f64> {
        &self.standard_potentials
    }

    pub fn phases(&self) -> &[Range<usize>] {
        &self.phases
    }

    /// Total amount of every phase
    pub fn phase_amounts(&self, n: &DVector<f64>) -> Vec<f64> {
        self.phases
            .iter()
            .map(|phase| n.rows(phase.start, phase.len()).sum())
            .collect()
    }
}

impl GibbsModel for IdealMixture {
    fn num_species(&self) -> usize {
        self.standard_potentials.len()
    }

    fn gibbs_energy(&self, n: &DVector<f64>) -> f64 {
        n.dot(&self.chemical_potentials(n))
    }

    fn chemical_potentials(&self, n: &DVector<f64>) -> DVector<f64> {
        let mut mu = self.standard_potentials.clone();
        for (phase, total) in self.phases.iter().zip(self.phase_amounts(n)) {
            if phase.len() > 1 {
                for i in phase.clone() {
                    mu[i] += (n[i] / total).ln();
                }
            }
        }
        mu
    }

    fn chemical_potentials_derivatives(&self, n: &DVector<f64>) -> DMatrix<f64> {
        let size = self.num_species();
        let mut derivatives = DMatrix::zeros(size, size);
        for (phase, total) in self.phases.iter().zip(self.phase_amounts(n)) {
            if phase.len() == 1 {
                continue;
            }
            for i in phase.clone() {
                for j in phase.clone() {
                    derivatives[(i, j)] = -1.0 / total;
                }
                derivatives[(i, i)] += 1.0 / n[i];
            }
        }
        derivatives
    }

    /// `1 / n_i` for species of a mixed phase, zero for pure phases
    fn chemical_potentials_diagonal(&self, n: &DVector<f64>) -> DVector<f64> {
        let mut diagonal = DVector::zeros(self.num_species());
        for phase in self.phases.iter().filter(|phase| phase.len() > 1) {
            for i in phase.clone() {
                diagonal[i] = 1.0 / n[i];
            }
        }
        diagonal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    const TOLERANCE: f64 = 1e-12;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_single_phase_potentials() {
        let model = IdealMixture::single_phase(dvector![0.0, -1.0]);
        let n = dvector![1.0, 3.0];

        let mu = model.chemical_potentials(&n);
        assert!((mu[0] - 0.25_f64.ln()).abs() < TOLERANCE);
        assert!((mu[1] - (-1.0 + 0.75_f64.ln())).abs() < TOLERANCE);

        let g = model.gibbs_energy(&n);
        assert!((g - (mu[0] + 3.0 * mu[1])).abs() < TOLERANCE);
    }

    #[test]
    fn test_derivatives_match_finite_differences() -> TestResult {
        let model = IdealMixture::new(dvector![0.5, -1.0, 2.0, -3.0], &[3, 1])?;
        let n = dvector![0.4, 1.3, 0.7, 2.0];
        let derivatives = model.chemical_potentials_derivatives(&n);

        let step = 1e-6;
        for j in 0..4 {
            let mut forward = n.clone();
            let mut backward = n.clone();
            forward[j] += step;
            backward[j] -= step;
            let column = (model.chemical_potentials(&forward)
                - model.chemical_potentials(&backward))
                / (2.0 * step);
            for i in 0..4 {
                assert!((derivatives[(i, j)] - column[i]).abs() < 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn test_gradient_of_gibbs_energy() -> TestResult {
        let model = IdealMixture::new(dvector![0.1, 0.2, -0.3], &[2, 1])?;
        let n = dvector![0.5, 1.5, 2.5];
        let mu = model.chemical_potentials(&n);

        let step = 1e-6;
        for i in 0..3 {
            let mut forward = n.clone();
            let mut backward = n.clone();
            forward[i] += step;
            backward[i] -= step;
            let slope =
                (model.gibbs_energy(&forward) - model.gibbs_energy(&backward)) / (2.0 * step);
            assert!((slope - mu[i]).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_pure_phase_has_constant_potential() -> TestResult {
        let model = IdealMixture::new(dvector![1.0, 2.0, -4.0], &[2, 1])?;
        let n = dvector![1.0, 1.0, 7.0];

        assert_eq!(model.chemical_potentials(&n)[2], -4.0);
        let derivatives = model.chemical_potentials_derivatives(&n);
        assert!(derivatives.row(2).iter().all(|v| *v == 0.0));
        assert!(derivatives.column(2).iter().all(|v| *v == 0.0));
        assert_eq!(model.chemical_potentials_diagonal(&n), dvector![1.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_phase_amounts() -> TestResult {
        let model = IdealMixture::new(dvector![0.0, 0.0, 0.0], &[1, 2])?;
        assert_eq!(model.phase_amounts(&dvector![1.0, 2.0, 3.0]), vec![1.0, 5.0]);
        assert_eq!(model.phases(), &[0..1, 1..3]);
        Ok(())
    }

    #[test]
    fn test_invalid_phase_layout() {
        assert!(matches!(
            IdealMixture::new(dvector![0.0, 0.0], &[1, 0, 1]),
            Err(EquilibriumError::InvalidModel(_))
        ));
        assert!(matches!(
            IdealMixture::new(dvector![0.0, 0.0], &[3]),
            Err(EquilibriumError::InconsistentDimensions { expected: 2, actual: 3, .. })
        ));
        assert!(matches!(
            IdealMixture::new(dvector![f64::NAN], &[1]),
            Err(EquilibriumError::InvalidModel(_))
        ));
    }
}
