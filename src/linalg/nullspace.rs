//! Nullspace elimination of the KKT system.
//!
//! The constraint Jacobian is reduced to row echelon form `E A = [I S]` (up to a column
//! permutation), splitting the variables into basic and nonbasic sets. The columns of
//!
//! ```text
//! Z = [ -S ]   (basic rows)
//!     [  I ]   (nonbasic rows)
//! ```
//!
//! span the null space of `A`, and every primal step is written `dx = xp + Z q` where
//! `xp` satisfies `A xp = ry` with zero nonbasic part. Only the `(n − m)` square reduced
//! Hessian `Zᵀ G Z` is factored, which pays off when there are few constraints.
//!
//! The multipliers follow from the basic rows of `G dx − Aᵀ dy = r̃x`, i.e.
//! `dy = Eᵀ (G dx − r̃x)_B`.

use nalgebra::{DMatrix, DVector};

use crate::linalg::{
    KktMatrix, KktSolution, KktSolver, KktStrategy, KktVector, LinAlgError, LinAlgResult,
    SymmetricFactor, check_rhs, column_from_faer, column_to_faer, condensed_rhs, recover_dz,
    to_faer,
};

/// Reduced row echelon form of `[A | I]`
#[derive(Debug, Clone)]
pub(crate) struct Echelon {
    /// Basic (pivot) columns of `A`, in row order
    pub pivots: Vec<usize>,
    /// Nonbasic columns of `A`, ascending
    pub free: Vec<usize>,
    /// Accumulated row operations, `E A_B = I` (m × m)
    pub e: DMatrix<f64>,
    /// Reduced Jacobian `E A` (m × n)
    pub s: DMatrix<f64>,
}

/// Gauss-Jordan elimination of `[A | I]` with partial pivoting.
///
/// Columns whose largest remaining entry is below a relative threshold are treated as
/// dependent. Returns the reduced augmented matrix and the pivot columns of `A`.
fn row_reduce(a: &DMatrix<f64>) -> (DMatrix<f64>, Vec<usize>) {
    let (m, n) = a.shape();
    let mut r = DMatrix::zeros(m, n + m);
    r.view_mut((0, 0), (m, n)).copy_from(a);
    for i in 0..m {
        r[(i, n + i)] = 1.0;
    }

    let scale = a.amax().max(1.0);
    let threshold = scale * f64::EPSILON * (n.max(m) as f64) * 16.0;

    let mut pivots = Vec::with_capacity(m);
    let mut row = 0;
    for col in 0..n {
        if row == m {
            break;
        }
        let (offset, max) = r
            .view((row, col), (m - row, 1))
            .iter()
            .map(|v| v.abs())
            .enumerate()
            .fold((0, 0.0), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        if max <= threshold {
            continue;
        }

        r.swap_rows(row, row + offset);
        let pivot = r[(row, col)];
        r.row_mut(row).unscale_mut(pivot);
        for other in 0..m {
            if other != row {
                let factor = r[(other, col)];
                if factor != 0.0 {
                    for j in 0..n + m {
                        let v = r[(row, j)];
                        r[(other, j)] -= factor * v;
                    }
                }
            }
        }
        pivots.push(col);
        row += 1;
    }
    (r, pivots)
}

/// Numerical rank of `a`, with the same dependency threshold as [`echelon`]
pub(crate) fn matrix_rank(a: &DMatrix<f64>) -> usize {
    row_reduce(a).1.len()
}

/// Row-reduce `a` into the basic/nonbasic splitting of its columns.
///
/// Fails with [`LinAlgError::RankDeficient`] when `a` has fewer than `m` independent rows.
pub(crate) fn echelon(a: &DMatrix<f64>) -> LinAlgResult<Echelon> {
    let (m, n) = a.shape();
    let (r, pivots) = row_reduce(a);
    if pivots.len() < m {
        return Err(LinAlgError::RankDeficient {
            rank: pivots.len(),
            expected: m,
        }
        .log());
    }

    let free = (0..n).filter(|j| !pivots.contains(j)).collect();
    Ok(Echelon {
        pivots,
        free,
        e: r.columns(n, m).into_owned(),
        s: r.columns(0, n).into_owned(),
    })
}

struct NullspaceFactorization {
    echelon: Echelon,
    /// Null space basis (n × k)
    basis: DMatrix<f64>,
    /// Condensed Hessian `G = H + diag(z/x)`
    g: DMatrix<f64>,
    reduced: Option<SymmetricFactor>,
    x: DVector<f64>,
    z: DVector<f64>,
}

/// KKT solver projecting onto the null space of the constraint Jacobian
#[derive(Default)]
pub struct NullspaceSolver {
    factorization: Option<NullspaceFactorization>,
}

impl NullspaceSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KktSolver for NullspaceSolver {
    fn decompose(&mut self, lhs: &KktMatrix<'_>) -> LinAlgResult<()> {
        lhs.validate()?;
        self.factorization = None;

        let n = lhs.num_variables();
        let echelon = echelon(lhs.a)?;

        let k = echelon.free.len();
        let mut basis = DMatrix::zeros(n, k);
        for (q, &j) in echelon.free.iter().enumerate() {
            basis[(j, q)] = 1.0;
            for (row, &c) in echelon.pivots.iter().enumerate() {
                basis[(c, q)] = -echelon.s[(row, j)];
            }
        }

        let g = lhs.condensed_hessian();
        let reduced = if k > 0 {
            let zgz = basis.transpose() * &g * &basis;
            Some(SymmetricFactor::factorize(&to_faer(&zgz))?)
        } else {
            None
        };

        self.factorization = Some(NullspaceFactorization {
            echelon,
            basis,
            g,
            reduced,
            x: lhs.x.clone(),
            z: lhs.z.clone(),
        });
        Ok(())
    }

    fn solve(&self, rhs: &KktVector) -> LinAlgResult<KktSolution> {
        let fact = self.factorization.as_ref().ok_or(LinAlgError::NotDecomposed)?;
        let pivots = &fact.echelon.pivots;
        check_rhs(rhs, fact.x.len(), pivots.len())?;

        let rxt = condensed_rhs(rhs, &fact.x);

        let mut dx = DVector::zeros(fact.x.len());
        let basic = &fact.echelon.e * &rhs.ry;
        for (row, &c) in pivots.iter().enumerate() {
            dx[c] = basic[row];
        }

        if let Some(reduced) = &fact.reduced {
            let r = fact.basis.transpose() * (&rxt - &fact.g * &dx);
            let q = column_from_faer(&reduced.solve(&column_to_faer(&r)));
            dx += &fact.basis * q;
        }

        let w = &fact.g * &dx - &rxt;
        let w_basic = DVector::from_fn(pivots.len(), |row, _| w[pivots[row]]);
        let dy = fact.echelon.e.transpose() * w_basic;
        let dz = recover_dz(rhs, &fact.x, &fact.z, &dx);

        let solution = KktSolution { dx, dy, dz };
        if !solution.is_finite() {
            return Err(LinAlgError::SingularMatrix.log());
        }
        Ok(solution)
    }

    fn strategy(&self) -> KktStrategy {
        KktStrategy::Nullspace
    }
}
