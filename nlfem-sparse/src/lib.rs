//! Sparse symmetric operators and the conjugate-gradient solver used by `nlfem`.
//!
//! The assembly engine in `nlfem` stores symmetric matrices in upper-triangular
//! CSR form. This crate provides the matching linear-operator view and a
//! preconditioned conjugate-gradient solver that consumes it.

pub mod cg;

mod ops;

pub use ops::{DiagonalPreconditioner, IdentityOperator, LinearOperator, SymmetricUpperCsr};
