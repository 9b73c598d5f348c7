//! Mesh readers and field writers.

pub mod csv;
pub mod su2;
pub mod vtk;
