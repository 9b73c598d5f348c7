//! One-dimensional heat conduction with the mixed local-nonlocal model.
//!
//! Shares the two-pass assembly engine and the interior/Dirichlet row
//! separation with the 2D path; only the integrands and the two-point
//! boundary handling differ.

use crate::assembly::{self, CsrPairAssembler, SystemMatrices};
use crate::bc::{BoundaryKind, NEUMANN_FLUX_TOLERANCE};
use crate::heat::{add_scaled_csr, reset_dirichlet_diagonal, HeatParameters, TimeStepping};
use crate::mesh1d::Mesh1d;
use crate::solve::{self, Algorithm};
use crate::{Error, Real, Result};
use nalgebra::{DVector, DVectorView, DVectorViewMut, SMatrix, SVector};
use nlfem_sparse::{LinearOperator, SymmetricUpperCsr};

/// Boundary condition at one end of the segment: kind plus prescribed
/// value (temperature or flux).
pub type Boundary1d<T> = (BoundaryKind, T);

/// Time-dependent boundary condition at one end.
pub type TimeBoundary1d<'a, T> = (BoundaryKind, &'a dyn Fn(T) -> T);

pub struct HeatSolver1d<'a, T: Real> {
    mesh: Option<&'a Mesh1d<T>>,
    algorithm: Algorithm,
}

impl<'a, T> HeatSolver1d<'a, T>
where
    T: Real + Send + Sync,
{
    pub fn new(mesh: &'a Mesh1d<T>) -> Self {
        Self {
            mesh: Some(mesh),
            algorithm: Algorithm::default(),
        }
    }

    /// A solver with no mesh attached; any solve attempt fails with
    /// `Error::NullProxy` until `set_mesh` is called.
    pub fn detached() -> Self {
        Self {
            mesh: None,
            algorithm: Algorithm::default(),
        }
    }

    pub fn set_mesh(&mut self, mesh: &'a Mesh1d<T>) {
        self.mesh = Some(mesh);
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn mesh(&self) -> Result<&'a Mesh1d<T>> {
        self.mesh.ok_or(Error::NullProxy)
    }

    pub fn stationary<F, W>(
        &self,
        parameters: &HeatParameters<T>,
        boundary: [Boundary1d<T>; 2],
        right_part: F,
        influence: W,
    ) -> Result<DVector<T>>
    where
        F: Fn(T) -> T + Sync,
        W: Fn(T, T) -> T + Sync,
    {
        let mesh = self.mesh()?;
        parameters.validate()?;

        let neumann =
            boundary[0].0 == BoundaryKind::SecondKind && boundary[1].0 == BoundaryKind::SecondKind;
        if neumann {
            let residual: f64 =
                nalgebra::try_convert(boundary[0].1 + boundary[1].1).unwrap_or(f64::NAN);
            if !(residual.abs() < NEUMANN_FLUX_TOLERANCE) {
                return Err(Error::UnsolvableNeumann { residual });
            }
        }

        let matrices = self.conductivity_matrices(mesh, parameters, boundary.map(|(kind, _)| kind), neumann, &influence)?;

        let nodes_count = mesh.nodes_count();
        let mut f = vec![T::zero(); matrices.inner.nrows()];
        assembly::integrate_right_part::<_, _, _, 1>(&mut f, mesh, |e, i| {
            SVector::<T, 1>::new(integrate_function(mesh, e, i, &right_part))
        });
        apply_second_kind(boundary, &mut f, nodes_count);
        apply_first_kind(boundary, &matrices.bound, &mut f, nodes_count);

        let f = DVector::from_vec(f);
        let algorithm = if neumann { Algorithm::DenseLu } else { self.algorithm };
        let solution = solve::solve_symmetric_upper(&matrices.inner, &f, None, algorithm)?;
        Ok(DVector::from_iterator(nodes_count, solution.iter().take(nodes_count).copied()))
    }

    /// Implicit-Euler stepping with time-dependent boundary values; the
    /// callback receives `(step, temperature)` every `save_frequency`
    /// steps and the final field is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn nonstationary<F, W, I, S>(
        &self,
        stepping: &TimeStepping<T>,
        parameters: &HeatParameters<T>,
        boundary: [TimeBoundary1d<'_, T>; 2],
        initial: I,
        right_part: F,
        influence: W,
        mut on_step: S,
    ) -> Result<DVector<T>>
    where
        F: Fn(T) -> T + Sync,
        W: Fn(T, T) -> T + Sync,
        I: Fn(T) -> T,
        S: FnMut(usize, &[T]),
    {
        let mesh = self.mesh()?;
        parameters.validate()?;
        if stepping.steps == 0 {
            return Err(Error::ConfigInvalid("time stepping requires at least one step".to_string()));
        }
        let kinds = [boundary[0].0, boundary[1].0];
        if kinds[0] == BoundaryKind::SecondKind && kinds[1] == BoundaryKind::SecondKind {
            return Err(Error::ConfigInvalid(
                "the non-stationary solver requires at least one first-kind boundary".to_string(),
            ));
        }

        let nodes_count = mesh.nodes_count();
        let stiffness = self.conductivity_matrices(mesh, parameters, kinds, false, &influence)?;
        let capacity = self.capacity_matrices(mesh, parameters, kinds)?;

        let tau = (stepping.interval[1] - stepping.interval[0]) / T::from_usize(stepping.steps).unwrap();
        let inner_dofs = inner_node_mask(kinds, nodes_count);
        let mut a_inner = add_scaled_csr(&capacity.inner, &stiffness.inner, tau);
        reset_dirichlet_diagonal(&mut a_inner, &inner_dofs, 0);
        let a_bound = add_scaled_csr(&capacity.bound, &stiffness.bound, tau);

        let mut load = vec![T::zero(); nodes_count];
        assembly::integrate_right_part::<_, _, _, 1>(&mut load, mesh, |e, i| {
            SVector::<T, 1>::new(integrate_function(mesh, e, i, &right_part))
        });

        let boundary_at = |t: T| -> [Boundary1d<T>; 2] {
            [(kinds[0], (boundary[0].1)(t)), (kinds[1], (boundary[1].1)(t))]
        };

        let mut temperature =
            DVector::from_iterator(nodes_count, (0..nodes_count).map(|i| initial(mesh.node_coord(i))));
        {
            let bound_now = boundary_at(stepping.interval[0]);
            for b in 0..2 {
                if bound_now[b].0 == BoundaryKind::FirstKind {
                    let node = if b == 0 { 0 } else { nodes_count - 1 };
                    temperature[node] = bound_now[b].1;
                }
            }
        }
        if stepping.save_frequency != 0 {
            on_step(0, temperature.as_slice());
        }

        let capacity_operator = SymmetricUpperCsr(&capacity.inner);
        let mut rhs = DVector::zeros(nodes_count);
        for step in 1..=stepping.steps {
            let t = stepping.interval[0] + tau * T::from_usize(step).unwrap();
            let bound_now = boundary_at(t);

            capacity_operator
                .apply(DVectorViewMut::from(&mut rhs), DVectorView::from(&temperature))
                .map_err(|err| Error::SolverFailed(err.to_string()))?;
            for (row, csr_row) in capacity.bound.row_iter().enumerate() {
                for (&col, &value) in csr_row.col_indices().iter().zip(csr_row.values()) {
                    rhs[row] += value * temperature[col];
                }
            }
            for (row, &load_row) in load.iter().enumerate() {
                rhs[row] += tau * load_row;
            }
            {
                let mut flux_step = vec![T::zero(); nodes_count];
                apply_second_kind(bound_now, &mut flux_step, nodes_count);
                for (row, &flux_row) in flux_step.iter().enumerate() {
                    rhs[row] += tau * flux_row;
                }
            }

            let mut rhs_step = rhs.as_slice().to_vec();
            apply_first_kind(bound_now, &a_bound, &mut rhs_step, nodes_count);
            let rhs_step = DVector::from_vec(rhs_step);

            temperature = solve::solve_symmetric_upper(&a_inner, &rhs_step, Some(&temperature), self.algorithm)?;

            if stepping.save_frequency != 0 && step % stepping.save_frequency == 0 {
                on_step(step, temperature.as_slice());
            }
        }

        Ok(temperature)
    }

    fn conductivity_matrices<W>(
        &self,
        mesh: &'a Mesh1d<T>,
        parameters: &HeatParameters<T>,
        kinds: [BoundaryKind; 2],
        neumann: bool,
        influence: &W,
    ) -> Result<SystemMatrices<T>>
    where
        W: Fn(T, T) -> T + Sync,
    {
        let nonlocal = assembly::is_nonlocal(parameters.local_weight);
        if nonlocal && !mesh.has_neighbors() {
            return Err(Error::ConfigInvalid(
                "nonlocal weight is active but the neighbour search has not been run".to_string(),
            ));
        }

        let assembler =
            CsrPairAssembler::<_, 1>::new(mesh, inner_node_mask(kinds, mesh.nodes_count()), neumann)?;
        let factor_local = parameters.conductivity * parameters.local_weight;
        let factor_nonlocal = parameters.conductivity * (T::one() - parameters.local_weight);
        assembler.assemble(
            nonlocal,
            |e, i, j| SMatrix::<T, 1, 1>::new(factor_local * integrate_loc(mesh, e, i, j)),
            |e_l, e_nl, i_l, j_nl| {
                SMatrix::<T, 1, 1>::new(factor_nonlocal * integrate_nonloc(mesh, influence, e_l, e_nl, i_l, j_nl))
            },
            |e, i| integrate_basic(mesh, e, i),
        )
    }

    fn capacity_matrices(
        &self,
        mesh: &'a Mesh1d<T>,
        parameters: &HeatParameters<T>,
        kinds: [BoundaryKind; 2],
    ) -> Result<SystemMatrices<T>> {
        let assembler =
            CsrPairAssembler::<_, 1>::new(mesh, inner_node_mask(kinds, mesh.nodes_count()), false)?;
        let factor = parameters.density * parameters.capacity;
        assembler.assemble(
            false,
            |e, i, j| SMatrix::<T, 1, 1>::new(factor * integrate_basic_pair(mesh, e, i, j)),
            |_, _, _, _| SMatrix::<T, 1, 1>::zeros(),
            |e, i| integrate_basic(mesh, e, i),
        )
    }
}

/// Writes one `x,value` row per node, the step format of the
/// non-stationary logger.
pub fn save_step_csv<T: Real>(
    path: impl AsRef<std::path::Path>,
    mesh: &Mesh1d<T>,
    temperature: &[T],
) -> std::io::Result<()> {
    use std::fmt::Write as FmtWrite;
    use std::io::Write as IoWrite;

    assert_eq!(temperature.len(), mesh.nodes_count());
    let mut out = String::new();
    for (node, &value) in temperature.iter().enumerate() {
        let x: f64 = nalgebra::try_convert(mesh.node_coord(node)).unwrap_or(f64::NAN);
        let value: f64 = nalgebra::try_convert(value).unwrap_or(f64::NAN);
        writeln!(&mut out, "{},{}", x, value).unwrap();
    }
    std::fs::File::create(path)?.write_all(out.as_bytes())
}

fn inner_node_mask(kinds: [BoundaryKind; 2], nodes_count: usize) -> Vec<bool> {
    let mut mask = vec![true; nodes_count];
    if kinds[0] == BoundaryKind::FirstKind {
        mask[0] = false;
    }
    if kinds[1] == BoundaryKind::FirstKind {
        mask[nodes_count - 1] = false;
    }
    mask
}

fn apply_second_kind<T: Real>(boundary: [Boundary1d<T>; 2], f: &mut [T], nodes_count: usize) {
    if boundary[0].0 == BoundaryKind::SecondKind {
        f[0] += boundary[0].1;
    }
    if boundary[1].0 == BoundaryKind::SecondKind {
        f[nodes_count - 1] += boundary[1].1;
    }
}

fn apply_first_kind<T: Real>(
    boundary: [Boundary1d<T>; 2],
    k_bound: &nalgebra_sparse::CsrMatrix<T>,
    f: &mut [T],
    nodes_count: usize,
) {
    let mut x = vec![T::zero(); nodes_count];
    if boundary[0].0 == BoundaryKind::FirstKind {
        x[0] = boundary[0].1;
    }
    if boundary[1].0 == BoundaryKind::FirstKind {
        x[nodes_count - 1] = boundary[1].1;
    }

    for (row, f_row) in f.iter_mut().enumerate().take(k_bound.nrows()) {
        let csr_row = k_bound.row(row);
        for (&col, &value) in csr_row.col_indices().iter().zip(csr_row.values()) {
            *f_row -= value * x[col];
        }
    }

    if boundary[0].0 == BoundaryKind::FirstKind {
        f[0] = x[0];
    }
    if boundary[1].0 == BoundaryKind::FirstKind {
        f[nodes_count - 1] = x[nodes_count - 1];
    }
}

fn integrate_loc<T: Real>(mesh: &Mesh1d<T>, _e: usize, i: usize, j: usize) -> T {
    let el = mesh.element();
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n_xi(i, q) * el.q_n_xi(j, q);
    }
    integral / mesh.jacobian()
}

/// The Jacobians of the two affine maps cancel against the two physical
/// derivatives, so the double sum carries no geometric factor.
fn integrate_nonloc<T: Real, W>(
    mesh: &Mesh1d<T>,
    influence: &W,
    e_l: usize,
    e_nl: usize,
    i_l: usize,
    j_nl: usize,
) -> T
where
    W: Fn(T, T) -> T,
{
    let el = mesh.element();
    let mut integral = T::zero();
    for q_l in 0..el.qnodes_count() {
        let coord_l = mesh.quad_coord(e_l, q_l);
        let mut inner = T::zero();
        for q_nl in 0..el.qnodes_count() {
            let coord_nl = mesh.quad_coord(e_nl, q_nl);
            inner += el.weight(q_nl) * influence(coord_l, coord_nl) * el.q_n_xi(j_nl, q_nl);
        }
        integral += el.weight(q_l) * el.q_n_xi(i_l, q_l) * inner;
    }
    integral
}

fn integrate_basic_pair<T: Real>(mesh: &Mesh1d<T>, _e: usize, i: usize, j: usize) -> T {
    let el = mesh.element();
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * el.q_n(j, q);
    }
    integral * mesh.jacobian()
}

fn integrate_basic<T: Real>(mesh: &Mesh1d<T>, _e: usize, i: usize) -> T {
    let el = mesh.element();
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q);
    }
    integral * mesh.jacobian()
}

fn integrate_function<T: Real, F>(mesh: &Mesh1d<T>, e: usize, i: usize, f: &F) -> T
where
    F: Fn(T) -> T,
{
    let el = mesh.element();
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * f(mesh.quad_coord(e, q));
    }
    integral * mesh.jacobian()
}
