//! Fullspace factorization of the KKT system.
//!
//! Assembles the complete `(2n + m)` square system
//!
//! ```text
//! [ H   -Aᵀ  -I ]
//! [ A    0    0 ]
//! [ Z    0    X ]
//! ```
//!
//! and factors it with a partially pivoted LU. No structure is exploited, which makes this
//! the most robust strategy: it does not need a nonsingular condensed Hessian. The
//! constraint Jacobian must still have full row rank, otherwise the system is singular and
//! the direction comes out non-finite.

use faer::{
    Mat,
    linalg::solvers::{PartialPivLu, Solve},
};
use nalgebra::DVector;

use crate::linalg::{
    KktMatrix, KktSolution, KktSolver, KktStrategy, KktVector, LinAlgError, LinAlgResult,
    check_rhs,
};

/// KKT solver factoring the full indefinite system
#[derive(Default)]
pub struct FullspaceSolver {
    lu: Option<PartialPivLu<f64>>,
    n: usize,
    m: usize,
}

impl FullspaceSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble the full KKT matrix
    fn assemble(lhs: &KktMatrix<'_>) -> Mat<f64> {
        let n = lhs.num_variables();
        let m = lhs.num_constraints();
        let mut matrix = Mat::zeros(2 * n + m, 2 * n + m);

        let h = lhs.h.to_dense();
        for i in 0..n {
            for j in 0..n {
                matrix[(i, j)] = h[(i, j)];
            }
            for k in 0..m {
                matrix[(i, n + k)] = -lhs.a[(k, i)];
                matrix[(n + k, i)] = lhs.a[(k, i)];
            }
            matrix[(i, n + m + i)] = -1.0;
            matrix[(n + m + i, i)] = lhs.z[i];
            matrix[(n + m + i, n + m + i)] = lhs.x[i];
        }
        matrix
    }
}

impl KktSolver for FullspaceSolver {
    fn decompose(&mut self, lhs: &KktMatrix<'_>) -> LinAlgResult<()> {
        lhs.validate()?;
        self.lu = None;

        let matrix = Self::assemble(lhs);
        let size = matrix.nrows();
        if (0..size).any(|i| (0..size).any(|j| !matrix[(i, j)].is_finite())) {
            return Err(LinAlgError::FactorizationFailed(
                "KKT matrix contains non-finite entries".to_string(),
            )
            .log());
        }

        self.n = lhs.num_variables();
        self.m = lhs.num_constraints();
        self.lu = Some(matrix.partial_piv_lu());
        Ok(())
    }

    fn solve(&self, rhs: &KktVector) -> LinAlgResult<KktSolution> {
        let lu = self.lu.as_ref().ok_or(LinAlgError::NotDecomposed)?;
        let (n, m) = (self.n, self.m);
        check_rhs(rhs, n, m)?;

        let b = Mat::from_fn(2 * n + m, 1, |i, _| {
            if i < n {
                rhs.rx[i]
            } else if i < n + m {
                rhs.ry[i - n]
            } else {
                rhs.rz[i - n - m]
            }
        });
        let s = lu.solve(&b);

        let solution = KktSolution {
            dx: DVector::from_fn(n, |i, _| s[(i, 0)]),
            dy: DVector::from_fn(m, |i, _| s[(n + i, 0)]),
            dz: DVector::from_fn(n, |i, _| s[(n + m + i, 0)]),
        };
        if !solution.is_finite() {
            return Err(LinAlgError::SingularMatrix.log());
        }
        Ok(solution)
    }

    fn strategy(&self) -> KktStrategy {
        KktStrategy::Fullspace
    }
}
