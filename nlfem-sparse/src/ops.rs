use nalgebra::{ClosedAdd, ClosedDiv, ClosedMul, DVectorView, DVectorViewMut, Scalar};
use nalgebra_sparse::CsrMatrix;
use num::{One, Zero};
use std::error::Error;

/// An abstract linear operator `x -> A x`.
pub trait LinearOperator<T: Scalar> {
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

/// Plain (unsymmetric) CSR matrix-vector product.
impl<T> LinearOperator<T> for CsrMatrix<T>
where
    T: Scalar + Zero + ClosedAdd + ClosedMul + Copy,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        assert_eq!(self.ncols(), x.len());
        assert_eq!(self.nrows(), y.len());
        for (i, row) in self.row_iter().enumerate() {
            let mut sum = T::zero();
            for (&j, &v) in row.col_indices().iter().zip(row.values()) {
                sum += v * x[j];
            }
            y[i] = sum;
        }
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Symmetric view of an upper-triangular CSR matrix.
///
/// The wrapped matrix stores only entries with `col >= row`; the product is
/// computed as `y = U x + U^T x - diag(U) x`, i.e. the product with the full
/// symmetric matrix the upper triangle represents. The matrix must be square.
pub struct SymmetricUpperCsr<'a, T>(pub &'a CsrMatrix<T>);

impl<'a, T> SymmetricUpperCsr<'a, T> {
    pub fn matrix(&self) -> &CsrMatrix<T> {
        self.0
    }
}

impl<'a, T> LinearOperator<T> for SymmetricUpperCsr<'a, T>
where
    T: Scalar + Zero + ClosedAdd + ClosedMul + Copy,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        let a = self.0;
        assert_eq!(a.nrows(), a.ncols(), "symmetric operator requires a square matrix");
        assert_eq!(a.ncols(), x.len());
        assert_eq!(a.nrows(), y.len());
        y.fill(T::zero());
        for (i, row) in a.row_iter().enumerate() {
            for (&j, &v) in row.col_indices().iter().zip(row.values()) {
                debug_assert!(j >= i, "matrix is not upper triangular");
                y[i] += v * x[j];
                if j != i {
                    y[j] += v * x[i];
                }
            }
        }
        Ok(())
    }
}

/// Jacobi preconditioner built from the diagonal of an upper-triangular CSR matrix.
///
/// Rows whose diagonal is zero (or missing) are left unscaled.
pub struct DiagonalPreconditioner<T> {
    inverse_diagonal: Vec<T>,
}

impl<T> DiagonalPreconditioner<T>
where
    T: Scalar + Zero + One + ClosedDiv + Copy,
{
    pub fn from_upper_csr(a: &CsrMatrix<T>) -> Self {
        let mut inverse_diagonal = vec![T::one(); a.nrows()];
        for (i, row) in a.row_iter().enumerate() {
            // The diagonal of an upper-triangular row is its first entry, when present.
            if let (Some(&j), Some(&v)) = (row.col_indices().first(), row.values().first()) {
                if j == i && v != T::zero() {
                    inverse_diagonal[i] = T::one() / v;
                }
            }
        }
        Self { inverse_diagonal }
    }
}

impl<T> LinearOperator<T> for DiagonalPreconditioner<T>
where
    T: Scalar + ClosedMul + Copy,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        assert_eq!(self.inverse_diagonal.len(), x.len());
        for (i, &d) in self.inverse_diagonal.iter().enumerate() {
            y[i] = d * x[i];
        }
        Ok(())
    }
}
