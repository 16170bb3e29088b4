//! Rangespace elimination of the KKT system.
//!
//! After eliminating `dz`, the primal block is eliminated as well:
//!
//! ```text
//! dx = G⁻¹ (r̃x + Aᵀ dy)
//! (A G⁻¹ Aᵀ) dy = ry − A G⁻¹ r̃x
//! ```
//!
//! With a diagonal Hessian `G⁻¹` is a vector division, so the only factorization is the
//! m × m Schur complement `S = A G⁻¹ Aᵀ`. A dense Hessian is handled with a pivoted LU of `G`.

use faer::linalg::solvers::{PartialPivLu, Solve};
use nalgebra::{DMatrix, DVector};

use crate::core::problem::Hessian;
use crate::linalg::{
    KktMatrix, KktSolution, KktSolver, KktStrategy, KktVector, LinAlgError, LinAlgResult,
    SymmetricFactor, check_rhs, column_from_faer, column_to_faer, condensed_rhs, from_faer,
    recover_dz, to_faer,
};

/// Inverse action of the condensed Hessian `G`
enum CondensedInverse {
    Diagonal(DVector<f64>),
    Dense(PartialPivLu<f64>),
}

impl CondensedInverse {
    fn apply(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            CondensedInverse::Diagonal(g) => {
                let mut out = rhs.clone();
                for (i, mut row) in out.row_iter_mut().enumerate() {
                    row /= g[i];
                }
                out
            }
            CondensedInverse::Dense(lu) => from_faer(&lu.solve(&to_faer(rhs))),
        }
    }

    fn apply_vector(&self, rhs: &DVector<f64>) -> DVector<f64> {
        match self {
            CondensedInverse::Diagonal(g) => rhs.component_div(g),
            CondensedInverse::Dense(lu) => column_from_faer(&lu.solve(&column_to_faer(rhs))),
        }
    }
}

struct RangespaceFactorization {
    inverse: CondensedInverse,
    /// `W = G⁻¹ Aᵀ` (n × m)
    w: DMatrix<f64>,
    a: DMatrix<f64>,
    schur: Option<SymmetricFactor>,
    x: DVector<f64>,
    z: DVector<f64>,
}

/// KKT solver factoring the Schur complement of the constraint block
#[derive(Default)]
pub struct RangespaceSolver {
    factorization: Option<RangespaceFactorization>,
}

impl RangespaceSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KktSolver for RangespaceSolver {
    fn decompose(&mut self, lhs: &KktMatrix<'_>) -> LinAlgResult<()> {
        lhs.validate()?;
        self.factorization = None;

        let inverse = match lhs.h {
            Hessian::Diagonal(d) => {
                let g = d + lhs.barrier_diagonal();
                if g.iter().any(|v| *v == 0.0 || !v.is_finite()) {
                    return Err(LinAlgError::SingularMatrix.log());
                }
                CondensedInverse::Diagonal(g)
            }
            Hessian::Dense(_) => {
                let g = lhs.condensed_hessian();
                if g.iter().any(|v| !v.is_finite()) {
                    return Err(LinAlgError::FactorizationFailed(
                        "condensed Hessian contains non-finite entries".to_string(),
                    )
                    .log());
                }
                CondensedInverse::Dense(to_faer(&g).partial_piv_lu())
            }
        };

        let w = inverse.apply(&lhs.a.transpose());
        if w.iter().any(|v| !v.is_finite()) {
            return Err(LinAlgError::SingularMatrix.log());
        }

        let schur = if lhs.num_constraints() > 0 {
            let s = lhs.a * &w;
            Some(SymmetricFactor::factorize(&to_faer(&s))?)
        } else {
            None
        };

        self.factorization = Some(RangespaceFactorization {
            inverse,
            w,
            a: lhs.a.clone(),
            schur,
            x: lhs.x.clone(),
            z: lhs.z.clone(),
        });
        Ok(())
    }

    fn solve(&self, rhs: &KktVector) -> LinAlgResult<KktSolution> {
        let fact = self.factorization.as_ref().ok_or(LinAlgError::NotDecomposed)?;
        check_rhs(rhs, fact.x.len(), fact.a.nrows())?;

        let rxt = condensed_rhs(rhs, &fact.x);
        let u = fact.inverse.apply_vector(&rxt);

        let dy = match &fact.schur {
            Some(schur) => {
                let r = &rhs.ry - &fact.a * &u;
                column_from_faer(&schur.solve(&column_to_faer(&r)))
            }
            None => DVector::zeros(0),
        };
        let dx = u + &fact.w * &dy;
        let dz = recover_dz(rhs, &fact.x, &fact.z, &dx);

        let solution = KktSolution { dx, dy, dz };
        if !solution.is_finite() {
            return Err(LinAlgError::SingularMatrix.log());
        }
        Ok(solution)
    }

    fn strategy(&self) -> KktStrategy {
        KktStrategy::Rangespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    const TOLERANCE: f64 = 1e-12;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_diagonal_hessian_single_constraint() -> TestResult {
        // G = diag(2 + 1, 2 + 1) = 3 I, A = [1 1]
        let h = Hessian::Diagonal(dvector![2.0, 2.0]);
        let a = dmatrix![1.0, 1.0];
        let x = dvector![1.0, 1.0];
        let z = dvector![1.0, 1.0];
        let lhs = KktMatrix {
            h: &h,
            a: &a,
            x: &x,
            z: &z,
        };

        let mut solver = RangespaceSolver::new();
        solver.decompose(&lhs)?;
        let sol = solver.solve(&KktVector {
            rx: dvector![3.0, 0.0],
            ry: dvector![0.0],
            rz: dvector![0.0, 0.0],
        })?;

        // 3 dx - dy = (3, 0), dx1 + dx2 = 0  =>  dy = -1.5, dx = (0.5, -0.5)
        assert!((sol.dx[0] - 0.5).abs() < TOLERANCE);
        assert!((sol.dx[1] + 0.5).abs() < TOLERANCE);
        assert!((sol.dy[0] + 1.5).abs() < TOLERANCE);
        assert!((sol.dz[0] + 0.5).abs() < TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_unconstrained_system() -> TestResult {
        let h = Hessian::Diagonal(dvector![1.0]);
        let a = DMatrix::zeros(0, 1);
        let x = dvector![2.0];
        let z = dvector![2.0];
        let lhs = KktMatrix {
            h: &h,
            a: &a,
            x: &x,
            z: &z,
        };

        let mut solver = RangespaceSolver::new();
        solver.decompose(&lhs)?;
        let sol = solver.solve(&KktVector {
            rx: dvector![4.0],
            ry: DVector::zeros(0),
            rz: dvector![0.0],
        })?;
        assert!((sol.dx[0] - 2.0).abs() < TOLERANCE);
        assert_eq!(sol.dy.len(), 0);
        Ok(())
    }

    #[test]
    fn test_zero_condensed_diagonal_is_singular() {
        let h = Hessian::Diagonal(dvector![-1.0, 1.0]);
        let a = dmatrix![1.0, 1.0];
        let x = dvector![1.0, 1.0];
        let z = dvector![1.0, 1.0];
        let lhs = KktMatrix {
            h: &h,
            a: &a,
            x: &x,
            z: &z,
        };

        let mut solver = RangespaceSolver::new();
        assert!(matches!(
            solver.decompose(&lhs),
            Err(LinAlgError::SingularMatrix)
        ));
    }
}
