//! Boundary conditions: per-group, per-component kind and value function.
//!
//! Second-kind (flux) conditions are integrated into the right-hand side
//! before first-kind (prescribed value) elimination, which subtracts
//! `K_bound * x` and overwrites the owned Dirichlet rows with the prescribed
//! values.

use crate::mesh::proxy::MeshProxy;
use crate::mesh::Mesh2d;
use crate::{Error, Real, Result};
use nalgebra::Point2;
use nalgebra_sparse::CsrMatrix;
use std::sync::Arc;

/// Threshold on the net boundary flux of a pure-Neumann problem.
pub const NEUMANN_FLUX_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Prescribed value (Dirichlet).
    FirstKind,
    /// Prescribed flux (Neumann).
    SecondKind,
}

pub type BoundaryFn<T> = Arc<dyn Fn(&Point2<T>) -> T + Send + Sync>;

/// Kind and value function for one degree-of-freedom component.
#[derive(Clone)]
pub struct BoundaryComponent<T: crate::Real> {
    pub kind: BoundaryKind,
    value: BoundaryFn<T>,
}

impl<T: Real> BoundaryComponent<T> {
    pub fn first_kind(value: impl Fn(&Point2<T>) -> T + Send + Sync + 'static) -> Self {
        Self {
            kind: BoundaryKind::FirstKind,
            value: Arc::new(value),
        }
    }

    pub fn second_kind(value: impl Fn(&Point2<T>) -> T + Send + Sync + 'static) -> Self {
        Self {
            kind: BoundaryKind::SecondKind,
            value: Arc::new(value),
        }
    }

    pub fn value(&self, x: &Point2<T>) -> T {
        (self.value)(x)
    }
}

/// Boundary condition of one group: one component per degree of freedom.
#[derive(Clone)]
pub struct BoundaryCondition<T: crate::Real, const DOF: usize> {
    components: [BoundaryComponent<T>; DOF],
}

impl<T: Real, const DOF: usize> BoundaryCondition<T, DOF> {
    pub fn from_components(components: [BoundaryComponent<T>; DOF]) -> Self {
        Self { components }
    }

    pub fn component(&self, c: usize) -> &BoundaryComponent<T> {
        &self.components[c]
    }
}

impl<T: Real> BoundaryCondition<T, 1> {
    /// First-kind condition prescribing the field value.
    pub fn temperature(value: impl Fn(&Point2<T>) -> T + Send + Sync + 'static) -> Self {
        Self::from_components([BoundaryComponent::first_kind(value)])
    }

    /// Second-kind condition prescribing the flux.
    pub fn flux(value: impl Fn(&Point2<T>) -> T + Send + Sync + 'static) -> Self {
        Self::from_components([BoundaryComponent::second_kind(value)])
    }
}

/// Marks every degree of freedom that carries a first-kind condition on any
/// group containing its node. First-kind dominates on nodes shared between
/// groups.
pub fn inner_dof_mask<T: Real, const DOF: usize>(
    mesh: &Mesh2d<T>,
    conditions: &[BoundaryCondition<T, DOF>],
) -> Vec<bool> {
    assert_eq!(
        conditions.len(),
        mesh.boundary_groups_count(),
        "one boundary condition per boundary group is required"
    );
    let mut inner = vec![true; DOF * mesh.nodes_count()];
    for (b, condition) in conditions.iter().enumerate() {
        for c in 0..DOF {
            if condition.component(c).kind == BoundaryKind::FirstKind {
                for element in &mesh.boundary_group(b).elements {
                    for &node in &element.nodes {
                        inner[DOF * node + c] = false;
                    }
                }
            }
        }
    }
    inner
}

/// Whether every component of every group is second-kind.
pub fn is_pure_neumann<T: Real, const DOF: usize>(conditions: &[BoundaryCondition<T, DOF>]) -> bool {
    conditions.iter().all(|condition| {
        (0..DOF).all(|c| condition.component(c).kind == BoundaryKind::SecondKind)
    })
}

/// Integral of the boundary value function against the i-th shape function
/// of boundary element `e` in group `b`.
pub fn integrate_boundary_value<T: Real>(
    proxy: &MeshProxy<T>,
    b: usize,
    e: usize,
    i: usize,
    value: impl Fn(&Point2<T>) -> T,
) -> T {
    let el = proxy.element_1d(b, e);
    let coords = proxy.boundary_quad_coords(b, e);
    let jacobi = proxy.boundary_jacobi(b, e);
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * value(&coords[q]) * MeshProxy::jacobian_1d(&jacobi[q]);
    }
    integral
}

/// Verifies the compatibility condition of a pure-Neumann problem: the net
/// prescribed boundary flux must vanish. Rejected *before* assembly begins.
pub fn check_neumann_compatibility<T: Real, const DOF: usize>(
    proxy: &MeshProxy<T>,
    conditions: &[BoundaryCondition<T, DOF>],
) -> Result<()> {
    let mesh = proxy.mesh();
    let mut residual_squared = 0.0f64;
    for c in 0..DOF {
        let mut net_flux = T::zero();
        for (b, condition) in conditions.iter().enumerate() {
            let component = condition.component(c);
            if component.kind != BoundaryKind::SecondKind {
                continue;
            }
            for e in 0..mesh.boundary_group(b).elements.len() {
                let el = proxy.element_1d(b, e);
                let coords = proxy.boundary_quad_coords(b, e);
                let jacobi = proxy.boundary_jacobi(b, e);
                for q in 0..el.qnodes_count() {
                    net_flux +=
                        el.weight(q) * component.value(&coords[q]) * MeshProxy::jacobian_1d(&jacobi[q]);
                }
            }
        }
        let net_flux: f64 = nalgebra::try_convert(net_flux).unwrap_or(f64::NAN);
        residual_squared += net_flux * net_flux;
    }
    let residual = residual_squared.sqrt();
    if !(residual < NEUMANN_FLUX_TOLERANCE) {
        return Err(Error::UnsolvableNeumann { residual });
    }
    Ok(())
}

/// Integrates second-kind conditions into the owned block of `f`.
pub fn apply_second_kind<T: Real, const DOF: usize>(
    proxy: &MeshProxy<T>,
    conditions: &[BoundaryCondition<T, DOF>],
    f: &mut [T],
) {
    let mesh = proxy.mesh();
    let first = proxy.first_node();
    let last = proxy.last_node();
    for (b, condition) in conditions.iter().enumerate() {
        for c in 0..DOF {
            let component = condition.component(c);
            if component.kind != BoundaryKind::SecondKind {
                continue;
            }
            for (e, element) in mesh.boundary_group(b).elements.iter().enumerate() {
                for (i, &node) in element.nodes.iter().enumerate() {
                    if node < first || node >= last {
                        continue;
                    }
                    let row = DOF * (node - first) + c;
                    f[row] += integrate_boundary_value(proxy, b, e, i, |x| component.value(x));
                }
            }
        }
    }
}

/// Builds the Dirichlet value vector of length `DoF * nodes`: zero except on
/// first-kind boundary nodes. The first group wins on overlapping nodes.
pub fn dirichlet_vector<T: Real, const DOF: usize>(
    mesh: &Mesh2d<T>,
    conditions: &[BoundaryCondition<T, DOF>],
) -> Vec<T> {
    let mut x = vec![T::zero(); DOF * mesh.nodes_count()];
    let mut visited = vec![false; DOF * mesh.nodes_count()];
    for (b, condition) in conditions.iter().enumerate() {
        for c in 0..DOF {
            let component = condition.component(c);
            if component.kind != BoundaryKind::FirstKind {
                continue;
            }
            for element in &mesh.boundary_group(b).elements {
                for &node in &element.nodes {
                    let dof = DOF * node + c;
                    if !visited[dof] {
                        visited[dof] = true;
                        x[dof] = component.value(mesh.node(node));
                    }
                }
            }
        }
    }
    x
}

/// Eliminates first-kind conditions: `f -= K_bound * x`, then the owned
/// Dirichlet rows are overwritten with the prescribed values (their
/// `K_inner` diagonal is already 1).
pub fn apply_first_kind<T: Real, const DOF: usize>(
    proxy: &MeshProxy<T>,
    conditions: &[BoundaryCondition<T, DOF>],
    k_bound: &CsrMatrix<T>,
    f: &mut [T],
) {
    let mesh = proxy.mesh();
    let x = dirichlet_vector(mesh, conditions);

    for (row, f_row) in f.iter_mut().enumerate().take(k_bound.nrows()) {
        let csr_row = k_bound.row(row);
        for (&col, &value) in csr_row.col_indices().iter().zip(csr_row.values()) {
            *f_row -= value * x[col];
        }
    }

    let first = proxy.first_node();
    let last = proxy.last_node();
    for (b, condition) in conditions.iter().enumerate() {
        for c in 0..DOF {
            if condition.component(c).kind != BoundaryKind::FirstKind {
                continue;
            }
            for element in &mesh.boundary_group(b).elements {
                for &node in &element.nodes {
                    if node >= first && node < last {
                        f[DOF * (node - first) + c] = x[DOF * node + c];
                    }
                }
            }
        }
    }
}
