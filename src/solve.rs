//! Solver façade: hands the assembled upper-triangular system to a linear
//! solver and returns the dense solution vector.
//!
//! Algorithm choice and tolerances are configuration, not core behaviour.
//! The conjugate-gradient path works on the symmetric view of the stored
//! upper triangle; the dense factorisation path is the safe default for the
//! indefinite systems produced by the pure-Neumann augmentation. Distributed
//! solves are delegated to external collaborators; this façade requires the
//! full (single-rank) system.

use crate::{Error, Real, Result};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use nlfem_sparse::cg::{ConjugateGradient, RelativeResidualCriterion};
use nlfem_sparse::{DiagonalPreconditioner, SymmetricUpperCsr};

/// Linear solver selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Algorithm {
    /// Conjugate gradient on the symmetric-upper view. Requires a positive
    /// definite system.
    ConjugateGradient {
        tolerance: f64,
        max_iterations: usize,
    },
    /// Dense LU factorisation of the mirrored matrix. Handles the
    /// indefinite bordered systems of pure-Neumann problems.
    DenseLu,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::ConjugateGradient {
            tolerance: 1e-12,
            max_iterations: 10_000,
        }
    }
}

/// Reconstitutes the full symmetric matrix from its stored upper triangle.
pub fn dense_from_upper<T: Real>(k: &CsrMatrix<T>) -> DMatrix<T> {
    let mut dense = DMatrix::zeros(k.nrows(), k.ncols());
    for (i, row) in k.row_iter().enumerate() {
        for (&j, &v) in row.col_indices().iter().zip(row.values()) {
            dense[(i, j)] = v;
            if j != i && j < k.nrows() {
                dense[(j, i)] = v;
            }
        }
    }
    dense
}

/// Solves `K x = f` for an upper-triangular symmetric `K`, starting from the
/// given guess when one is supplied.
pub fn solve_symmetric_upper<T: Real>(
    k: &CsrMatrix<T>,
    f: &DVector<T>,
    guess: Option<&DVector<T>>,
    algorithm: Algorithm,
) -> Result<DVector<T>> {
    if k.nrows() != k.ncols() {
        return Err(Error::SolverFailed(format!(
            "distributed systems ({} x {}) must be handed to an external solver",
            k.nrows(),
            k.ncols()
        )));
    }
    if k.nrows() != f.len() {
        return Err(Error::SolverFailed(format!(
            "dimension mismatch: matrix is {} x {}, right-hand side has length {}",
            k.nrows(),
            k.ncols(),
            f.len()
        )));
    }

    match algorithm {
        Algorithm::ConjugateGradient {
            tolerance,
            max_iterations,
        } => {
            let criterion = RelativeResidualCriterion::new(T::from_f64(tolerance).unwrap());
            let mut cg = ConjugateGradient::with_criterion(criterion)
                .with_preconditioner(DiagonalPreconditioner::from_upper_csr(k))
                .with_max_iter(max_iterations);
            let operator = SymmetricUpperCsr(k);
            let mut x = match guess {
                Some(guess) => guess.clone(),
                None => DVector::zeros(f.len()),
            };
            cg.solve_with_guess(&operator, f, &mut x)
                .map_err(|err| Error::SolverFailed(err.to_string()))?;
            Ok(x)
        }
        Algorithm::DenseLu => {
            let dense = dense_from_upper(k);
            dense
                .lu()
                .solve(f)
                .ok_or_else(|| Error::SolverFailed("dense LU factorization is singular".to_string()))
        }
    }
}
