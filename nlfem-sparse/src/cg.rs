//! Preconditioned conjugate-gradient solver.

use crate::{IdentityOperator, LinearOperator};
use nalgebra::{DVector, DVectorView, DVectorViewMut, RealField};
use std::error::Error;
use std::fmt;

pub trait StoppingCriterion<T: RealField> {
    fn has_converged(
        &self,
        b_norm: T,
        iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind>;
}

/// Relative residual tolerance ||r|| <= tol * ||b||.
///
/// The *approximate* residual maintained by CG is used. For ill-conditioned
/// problems it may converge even though the true residual stagnates, but in
/// those cases CG would be unable to improve the solution anyway without a
/// better preconditioner.
#[derive(Debug)]
pub struct RelativeResidualCriterion<T> {
    tol: T,
}

impl<T> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-10)
    }
}

impl Default for RelativeResidualCriterion<f32> {
    fn default() -> Self {
        Self::new(1e-4)
    }
}

impl<T> StoppingCriterion<T> for RelativeResidualCriterion<T>
where
    T: RealField + Copy,
{
    fn has_converged(
        &self,
        b_norm: T,
        _iteration: usize,
        approx_residual: DVectorView<T>,
    ) -> Result<bool, SolveErrorKind> {
        Ok(approx_residual.norm() <= self.tol * b_norm)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error>),
    PreconditionerError(Box<dyn Error>),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "error applying preconditioner: {}", err),
            Self::IndefiniteOperator => write!(f, "operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "preconditioner appears to be indefinite"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "maximum number of iterations ({}) reached", max_iter)
            }
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub struct SolveError {
    pub iterations: usize,
    pub kind: SolveErrorKind,
}

impl SolveError {
    fn new(iterations: usize, kind: SolveErrorKind) -> Self {
        Self { iterations, kind }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CG failed after {} iterations: {}", self.iterations, self.kind)
    }
}

impl Error for SolveError {}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput {
    /// Number of updates made to the solution vector.
    pub num_iterations: usize,
}

/// Reusable buffers for repeated CG solves of the same dimension.
#[derive(Debug, Clone)]
pub struct CgWorkspace<T> {
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    ap: DVector<T>,
}

impl<T: RealField> Default for CgWorkspace<T> {
    fn default() -> Self {
        Self {
            r: DVector::zeros(0),
            z: DVector::zeros(0),
            p: DVector::zeros(0),
            ap: DVector::zeros(0),
        }
    }
}

impl<T: RealField + Copy> CgWorkspace<T> {
    fn prepare(&mut self, dim: usize) {
        self.r.resize_vertically_mut(dim, T::zero());
        self.z.resize_vertically_mut(dim, T::zero());
        self.p.resize_vertically_mut(dim, T::zero());
        self.ap.resize_vertically_mut(dim, T::zero());
    }
}

pub struct ConjugateGradient<T, P, Criterion> {
    workspace: CgWorkspace<T>,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<T: RealField> ConjugateGradient<T, IdentityOperator, RelativeResidualCriterion<T>>
where
    RelativeResidualCriterion<T>: Default,
{
    pub fn new() -> Self {
        Self {
            workspace: CgWorkspace::default(),
            preconditioner: IdentityOperator,
            stopping_criterion: RelativeResidualCriterion::default(),
            max_iter: None,
        }
    }
}

impl<T: RealField> Default for ConjugateGradient<T, IdentityOperator, RelativeResidualCriterion<T>>
where
    RelativeResidualCriterion<T>: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField, Criterion> ConjugateGradient<T, IdentityOperator, Criterion> {
    /// Starts from an explicit stopping criterion, without requiring a
    /// `Default` criterion for the scalar type.
    pub fn with_criterion(stopping_criterion: Criterion) -> Self {
        Self {
            workspace: CgWorkspace::default(),
            preconditioner: IdentityOperator,
            stopping_criterion,
            max_iter: None,
        }
    }
}

impl<T, P, Criterion> ConjugateGradient<T, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<T, P2, Criterion> {
        ConjugateGradient {
            workspace: self.workspace,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_stopping_criterion<C2>(self, stopping_criterion: C2) -> ConjugateGradient<T, P, C2> {
        ConjugateGradient {
            workspace: self.workspace,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<T, P, Criterion> ConjugateGradient<T, P, Criterion>
where
    T: RealField + Copy,
    P: LinearOperator<T>,
    Criterion: StoppingCriterion<T>,
{
    /// Solves `A x = b`, taking the initial contents of `x` as the starting guess.
    pub fn solve_with_guess<'a, A>(
        &mut self,
        operator: &A,
        b: impl Into<DVectorView<'a, T>>,
        x: impl Into<DVectorViewMut<'a, T>>,
    ) -> Result<CgOutput, SolveError>
    where
        A: LinearOperator<T>,
    {
        self.solve_with_guess_(operator, b.into(), x.into())
    }

    fn solve_with_guess_<A>(
        &mut self,
        operator: &A,
        b: DVectorView<T>,
        mut x: DVectorViewMut<T>,
    ) -> Result<CgOutput, SolveError>
    where
        A: LinearOperator<T>,
    {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len());

        let mut output = CgOutput { num_iterations: 0 };

        self.workspace.prepare(x.len());
        let CgWorkspace { r, z, p, ap } = &mut self.workspace;

        let b_norm = b.norm();
        if b_norm == T::zero() {
            x.fill(T::zero());
            return Ok(output);
        }

        // r = b - A x
        if let Err(err) = operator.apply(DVectorViewMut::from(&mut *r), DVectorView::from(&x)) {
            return Err(SolveError::new(output.num_iterations, OperatorError(err)));
        }
        r.zip_apply(&b, |ax_i, b_i| *ax_i = b_i - *ax_i);

        // z = P r
        if let Err(err) = self.preconditioner.apply(DVectorViewMut::from(&mut *z), DVectorView::from(&*r)) {
            return Err(SolveError::new(output.num_iterations, PreconditionerError(err)));
        }

        p.copy_from(z);
        let mut zr = z.dot(r);

        loop {
            let converged = self
                .stopping_criterion
                .has_converged(b_norm, output.num_iterations, DVectorView::from(&*r))
                .map_err(|kind| SolveError::new(output.num_iterations, kind))?;
            if converged {
                break;
            }
            if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output.num_iterations, MaxIterationsReached { max_iter }));
                }
            }

            if let Err(err) = operator.apply(DVectorViewMut::from(&mut *ap), DVectorView::from(&*p)) {
                return Err(SolveError::new(output.num_iterations, OperatorError(err)));
            }
            let pap = p.dot(ap);
            if pap <= T::zero() {
                return Err(SolveError::new(output.num_iterations, IndefiniteOperator));
            }
            if zr <= T::zero() {
                return Err(SolveError::new(output.num_iterations, IndefinitePreconditioner));
            }

            let alpha = zr / pap;
            x.zip_apply(&*p, |x_i, p_i| *x_i += alpha * p_i);
            r.zip_apply(&*ap, |r_i, ap_i| *r_i -= alpha * ap_i);
            output.num_iterations += 1;

            if let Err(err) = self.preconditioner.apply(DVectorViewMut::from(&mut *z), DVectorView::from(&*r)) {
                return Err(SolveError::new(output.num_iterations, PreconditionerError(err)));
            }
            let zr_next = z.dot(r);
            let beta = zr_next / zr;
            // p <- z + beta p
            p.zip_apply(&*z, |p_i, z_i| *p_i = z_i + beta * *p_i);
            zr = zr_next;
        }

        log::debug!("CG converged after {} iterations", output.num_iterations);
        Ok(output)
    }

    /// Solves `A x = b` from a zero starting guess.
    pub fn solve<'a, A>(&mut self, operator: &A, b: impl Into<DVectorView<'a, T>>) -> Result<DVector<T>, SolveError>
    where
        A: LinearOperator<T>,
    {
        let b = b.into();
        let mut x = DVector::zeros(b.len());
        self.solve_with_guess(operator, b, &mut x)?;
        Ok(x)
    }
}
