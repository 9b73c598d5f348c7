//! Finite-element solver for heat conduction and plane elasticity with a
//! mixed local-nonlocal (peridynamic-style) material model.
//!
//! The stiffness operator is the weighted combination
//! `p1 * L + (1 - p1) * N`, where `L` is the usual local bilinear form and
//! `N` is a nonlocal form whose kernel is an influence function with compact
//! support of radius `r`. Assembly produces a symmetric system split into an
//! upper-triangular interior block and the interior-Dirichlet coupling block
//! used for boundary-condition elimination.

pub mod assembly;
pub mod bc;
pub mod config;
pub mod elasticity;
pub mod element;
pub mod heat;
pub mod heat1d;
pub mod influence;
pub mod io;
pub mod mesh;
pub mod mesh1d;
pub mod quadrature;
pub mod solve;

mod error;

pub use error::{Error, Result};

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

use nalgebra::RealField;

pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
