//! Stationary and non-stationary heat conduction with the mixed
//! local-nonlocal conductivity model
//! `-div(lambda (p1 L + (1 - p1) N))[u] = f`.

use crate::assembly::{self, CsrPairAssembler, SystemMatrices};
use crate::bc::{self, BoundaryCondition};
use crate::element::ReferenceElement2d;
use crate::io;
use crate::mesh::proxy::MeshProxy;
use crate::solve::{self, Algorithm};
use crate::{Error, Real, Result};
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix2, Point2, SMatrix, SVector};
use nalgebra_sparse::CsrMatrix;
use nlfem_sparse::{LinearOperator, SymmetricUpperCsr};
use std::path::Path;

/// Physical and model parameters of the heat equation.
#[derive(Debug, Clone, Copy)]
pub struct HeatParameters<T> {
    pub conductivity: T,
    pub capacity: T,
    pub density: T,
    /// Local weight `p1`; values below `MAX_LOCAL_WEIGHT` activate the
    /// nonlocal term.
    pub local_weight: T,
    pub nonlocal_radius: T,
}

impl<T: Real> Default for HeatParameters<T> {
    fn default() -> Self {
        Self {
            conductivity: T::one(),
            capacity: T::one(),
            density: T::one(),
            local_weight: T::one(),
            nonlocal_radius: T::zero(),
        }
    }
}

impl<T: Real> HeatParameters<T> {
    pub fn validate(&self) -> Result<()> {
        if self.local_weight < T::zero() || self.local_weight > T::one() {
            return Err(Error::ConfigInvalid(
                "local weight p1 must lie in [0, 1]".to_string(),
            ));
        }
        if self.nonlocal_radius < T::zero() {
            return Err(Error::ConfigInvalid(
                "nonlocal radius must be nonnegative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Implicit-Euler time discretisation parameters.
#[derive(Debug, Clone, Copy)]
pub struct TimeStepping<T> {
    pub interval: [T; 2],
    pub steps: usize,
    /// Invoke the step callback every this many steps.
    pub save_frequency: usize,
}

/// Heat equation solver over a mesh proxy.
pub struct HeatSolver<'a, T: Real> {
    proxy: Option<&'a MeshProxy<T>>,
    algorithm: Algorithm,
}

impl<'a, T> HeatSolver<'a, T>
where
    T: Real + Send + Sync,
{
    pub fn new(proxy: &'a MeshProxy<T>) -> Self {
        Self {
            proxy: Some(proxy),
            algorithm: Algorithm::default(),
        }
    }

    /// A solver with no proxy attached; any solve attempt fails with
    /// `Error::NullProxy` until `set_proxy` is called.
    pub fn detached() -> Self {
        Self {
            proxy: None,
            algorithm: Algorithm::default(),
        }
    }

    pub fn set_proxy(&mut self, proxy: &'a MeshProxy<T>) {
        self.proxy = Some(proxy);
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    fn proxy(&self) -> Result<&'a MeshProxy<T>> {
        self.proxy.ok_or(Error::NullProxy)
    }

    /// Solves the stationary problem and returns the temperature field.
    pub fn stationary<F, W>(
        &self,
        parameters: &HeatParameters<T>,
        conditions: &[BoundaryCondition<T, 1>],
        right_part: F,
        influence: W,
    ) -> Result<HeatSolution<'a, T>>
    where
        F: Fn(&Point2<T>) -> T + Sync,
        W: Fn(&Point2<T>, &Point2<T>) -> T + Sync,
    {
        let proxy = self.proxy()?;
        parameters.validate()?;

        let neumann = bc::is_pure_neumann(conditions);
        if neumann {
            bc::check_neumann_compatibility(proxy, conditions)?;
        }

        let matrices = self.conductivity_matrices(proxy, parameters, conditions, &influence, neumann)?;

        let mut f = vec![T::zero(); matrices.inner.nrows()];
        assembly::integrate_right_part::<_, _, _, 1>(&mut f, proxy, |e, i| {
            SVector::<T, 1>::new(integrate_function(proxy, e, i, &right_part))
        });
        bc::apply_second_kind(proxy, conditions, &mut f);
        bc::apply_first_kind(proxy, conditions, &matrices.bound, &mut f);

        let f = DVector::from_vec(f);
        let algorithm = if neumann { Algorithm::DenseLu } else { self.algorithm };
        let solution = solve::solve_symmetric_upper(&matrices.inner, &f, None, algorithm)?;

        let nodes_count = proxy.mesh().nodes_count();
        let temperature = DVector::from_iterator(nodes_count, solution.iter().take(nodes_count).copied());
        Ok(HeatSolution::new(proxy, temperature))
    }

    /// Implicit-Euler time stepping: `(C + tau K) u^{n+1} = C u^n + tau (f +
    /// second-kind boundary terms)`, with first-kind conditions eliminated
    /// each step. The callback receives `(step, temperature)` every
    /// `save_frequency` steps; the final field is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn nonstationary<F, W, I, S>(
        &self,
        stepping: &TimeStepping<T>,
        parameters: &HeatParameters<T>,
        conditions: &[BoundaryCondition<T, 1>],
        initial: I,
        right_part: F,
        influence: W,
        mut on_step: S,
    ) -> Result<HeatSolution<'a, T>>
    where
        F: Fn(&Point2<T>) -> T + Sync,
        W: Fn(&Point2<T>, &Point2<T>) -> T + Sync,
        I: Fn(&Point2<T>) -> T,
        S: FnMut(usize, &[T]),
    {
        let proxy = self.proxy()?;
        parameters.validate()?;
        if stepping.steps == 0 {
            return Err(Error::ConfigInvalid("time stepping requires at least one step".to_string()));
        }
        if bc::is_pure_neumann(conditions) {
            return Err(Error::ConfigInvalid(
                "the non-stationary solver requires at least one first-kind boundary".to_string(),
            ));
        }

        let mesh = proxy.mesh();
        let nodes_count = mesh.nodes_count();
        let stiffness = self.conductivity_matrices(proxy, parameters, conditions, &influence, false)?;
        let capacity = self.capacity_matrices(proxy, parameters, conditions)?;

        let tau = (stepping.interval[1] - stepping.interval[0]) / T::from_usize(stepping.steps).unwrap();

        // A = C + tau K; the Dirichlet identity rows of both operands are
        // collapsed back to a single 1 on the diagonal.
        let inner_dofs = bc::inner_dof_mask(mesh, conditions);
        let mut a_inner = add_scaled_csr(&capacity.inner, &stiffness.inner, tau);
        reset_dirichlet_diagonal(&mut a_inner, &inner_dofs, proxy.first_node());
        let a_bound = add_scaled_csr(&capacity.bound, &stiffness.bound, tau);

        // Time-independent part of the right-hand side.
        let mut load = vec![T::zero(); a_inner.nrows()];
        assembly::integrate_right_part::<_, _, _, 1>(&mut load, proxy, |e, i| {
            SVector::<T, 1>::new(integrate_function(proxy, e, i, &right_part))
        });
        bc::apply_second_kind(proxy, conditions, &mut load);

        let dirichlet = bc::dirichlet_vector(mesh, conditions);
        let mut temperature = DVector::from_iterator(
            nodes_count,
            (0..nodes_count).map(|i| initial(mesh.node(i))),
        );
        for (dof, &inner) in inner_dofs.iter().enumerate() {
            if !inner {
                temperature[dof] = dirichlet[dof];
            }
        }

        if stepping.save_frequency != 0 {
            on_step(0, temperature.as_slice());
        }

        let capacity_operator = SymmetricUpperCsr(&capacity.inner);
        let mut rhs = DVector::zeros(nodes_count);
        for step in 1..=stepping.steps {
            // rhs = C u^n (+ the interior-Dirichlet coupling of C) + tau load
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

            let mut rhs_step = rhs.as_slice().to_vec();
            bc::apply_first_kind(proxy, conditions, &a_bound, &mut rhs_step);
            let rhs_step = DVector::from_vec(rhs_step);

            let next = solve::solve_symmetric_upper(&a_inner, &rhs_step, Some(&temperature), self.algorithm)?;
            temperature = next;

            if stepping.save_frequency != 0 && step % stepping.save_frequency == 0 {
                on_step(step, temperature.as_slice());
            }
        }

        Ok(HeatSolution::new(proxy, temperature))
    }

    fn conductivity_matrices<W>(
        &self,
        proxy: &'a MeshProxy<T>,
        parameters: &HeatParameters<T>,
        conditions: &[BoundaryCondition<T, 1>],
        influence: &W,
        neumann: bool,
    ) -> Result<SystemMatrices<T>>
    where
        W: Fn(&Point2<T>, &Point2<T>) -> T + Sync,
    {
        let nonlocal = assembly::is_nonlocal(parameters.local_weight);
        if nonlocal && !proxy.has_neighbors() {
            return Err(Error::ConfigInvalid(
                "nonlocal weight is active but the neighbour search has not been run".to_string(),
            ));
        }

        let inner_dofs = bc::inner_dof_mask(proxy.mesh(), conditions);
        let assembler = CsrPairAssembler::<_, 1>::new(proxy, inner_dofs, neumann)?;

        let factor_local = parameters.conductivity * parameters.local_weight;
        let factor_nonlocal = parameters.conductivity * (T::one() - parameters.local_weight);
        assembler.assemble(
            nonlocal,
            |e, i, j| SMatrix::<T, 1, 1>::new(factor_local * integrate_loc(proxy, e, i, j)),
            |e_l, e_nl, i_l, j_nl| {
                SMatrix::<T, 1, 1>::new(factor_nonlocal * integrate_nonloc(proxy, influence, e_l, e_nl, i_l, j_nl))
            },
            |e, i| integrate_basic(proxy, e, i),
        )
    }

    fn capacity_matrices(
        &self,
        proxy: &'a MeshProxy<T>,
        parameters: &HeatParameters<T>,
        conditions: &[BoundaryCondition<T, 1>],
    ) -> Result<SystemMatrices<T>> {
        let inner_dofs = bc::inner_dof_mask(proxy.mesh(), conditions);
        let assembler = CsrPairAssembler::<_, 1>::new(proxy, inner_dofs, false)?;
        let factor = parameters.density * parameters.capacity;
        assembler.assemble(
            false,
            |e, i, j| SMatrix::<T, 1, 1>::new(factor * integrate_basic_pair(proxy, e, i, j)),
            |_, _, _, _| SMatrix::<T, 1, 1>::zeros(),
            |e, i| integrate_basic(proxy, e, i),
        )
    }
}

/// Cofactor-weighted reference derivatives of shape function `i` at
/// quadrature node `q`: physical derivatives are these divided by `det J`.
#[inline]
fn cofactor_derivatives<T: Real>(el: &ReferenceElement2d<T>, i: usize, q: usize, j: &Matrix2<T>) -> (T, T) {
    let dx = el.q_n_xi(i, q) * j[(1, 1)] - el.q_n_eta(i, q) * j[(1, 0)];
    let dy = -el.q_n_xi(i, q) * j[(0, 1)] + el.q_n_eta(i, q) * j[(0, 0)];
    (dx, dy)
}

/// Local conductivity integrand over element `e` for the pair `(i, j)`.
pub fn integrate_loc<T: Real>(proxy: &MeshProxy<T>, e: usize, i: usize, j: usize) -> T {
    let el = proxy.element_2d(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        let j_m = &jacobi[q];
        let (dxi, dyi) = cofactor_derivatives(el, i, q, j_m);
        let (dxj, dyj) = cofactor_derivatives(el, j, q, j_m);
        integral += el.weight(q) * (dxi * dxj + dyi * dyj) / MeshProxy::jacobian(j_m);
    }
    integral
}

/// Nonlocal conductivity integrand between the element pair `(eL, eNL)`.
///
/// The inner sum collects the influence-weighted form gradient; the
/// cofactor form means the Jacobian determinants of both elements cancel
/// against the physical-derivative scaling.
pub fn integrate_nonloc<T: Real, W>(
    proxy: &MeshProxy<T>,
    influence: &W,
    e_l: usize,
    e_nl: usize,
    i_l: usize,
    j_nl: usize,
) -> T
where
    W: Fn(&Point2<T>, &Point2<T>) -> T,
{
    let el_l = proxy.element_2d(e_l);
    let el_nl = proxy.element_2d(e_nl);
    let coords_l = proxy.quad_coords(e_l);
    let coords_nl = proxy.quad_coords(e_nl);
    let jacobi_l = proxy.jacobi_matrices(e_l);
    let jacobi_nl = proxy.jacobi_matrices(e_nl);

    let mut integral = T::zero();
    for q_l in 0..el_l.qnodes_count() {
        let (dxi, dyi) = cofactor_derivatives(el_l, i_l, q_l, &jacobi_l[q_l]);
        let mut gx = T::zero();
        let mut gy = T::zero();
        for q_nl in 0..el_nl.qnodes_count() {
            let finit = el_nl.weight(q_nl) * influence(&coords_l[q_l], &coords_nl[q_nl]);
            let (dxj, dyj) = cofactor_derivatives(el_nl, j_nl, q_nl, &jacobi_nl[q_nl]);
            gx += finit * dxj;
            gy += finit * dyj;
        }
        integral += el_l.weight(q_l) * (dxi * gx + dyi * gy);
    }
    integral
}

/// Mass integrand `integral(N_i N_j |det J|)` over element `e`.
pub fn integrate_basic_pair<T: Real>(proxy: &MeshProxy<T>, e: usize, i: usize, j: usize) -> T {
    let el = proxy.element_2d(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * el.q_n(j, q) * MeshProxy::jacobian(&jacobi[q]);
    }
    integral
}

/// `integral(N_i |det J|)` over element `e`; feeds the pure-Neumann
/// augmentation column.
pub fn integrate_basic<T: Real>(proxy: &MeshProxy<T>, e: usize, i: usize) -> T {
    let el = proxy.element_2d(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * MeshProxy::jacobian(&jacobi[q]);
    }
    integral
}

/// `integral(N_i f(x) |det J|)` over element `e`.
pub fn integrate_function<T: Real, F>(proxy: &MeshProxy<T>, e: usize, i: usize, f: &F) -> T
where
    F: Fn(&Point2<T>) -> T,
{
    let el = proxy.element_2d(e);
    let coords = proxy.quad_coords(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut integral = T::zero();
    for q in 0..el.qnodes_count() {
        integral += el.weight(q) * el.q_n(i, q) * f(&coords[q]) * MeshProxy::jacobian(&jacobi[q]);
    }
    integral
}

/// Row-wise merge `a + alpha * b` of two upper CSR matrices with identical
/// dimensions (patterns may differ).
pub(crate) fn add_scaled_csr<T: Real>(a: &CsrMatrix<T>, b: &CsrMatrix<T>, alpha: T) -> CsrMatrix<T> {
    assert_eq!(a.nrows(), b.nrows());
    assert_eq!(a.ncols(), b.ncols());

    let mut offsets = Vec::with_capacity(a.nrows() + 1);
    let mut indices = Vec::new();
    let mut values = Vec::new();
    offsets.push(0);
    for row in 0..a.nrows() {
        let row_a = a.row(row);
        let row_b = b.row(row);
        let (cols_a, vals_a) = (row_a.col_indices(), row_a.values());
        let (cols_b, vals_b) = (row_b.col_indices(), row_b.values());
        let (mut ia, mut ib) = (0, 0);
        while ia < cols_a.len() || ib < cols_b.len() {
            let next_a = cols_a.get(ia).copied().unwrap_or(usize::MAX);
            let next_b = cols_b.get(ib).copied().unwrap_or(usize::MAX);
            if next_a < next_b {
                indices.push(next_a);
                values.push(vals_a[ia]);
                ia += 1;
            } else if next_b < next_a {
                indices.push(next_b);
                values.push(alpha * vals_b[ib]);
                ib += 1;
            } else {
                indices.push(next_a);
                values.push(vals_a[ia] + alpha * vals_b[ib]);
                ia += 1;
                ib += 1;
            }
        }
        offsets.push(indices.len());
    }
    CsrMatrix::try_from_csr_data(a.nrows(), a.ncols(), offsets, indices, values)
        .expect("CSR data must be valid by construction")
}

/// Collapses the Dirichlet rows of a combined matrix back to identity rows.
pub(crate) fn reset_dirichlet_diagonal<T: Real>(a: &mut CsrMatrix<T>, inner_dofs: &[bool], first_node: usize) {
    for local_row in 0..a.nrows() {
        let global_row = first_node + local_row;
        if global_row >= inner_dofs.len() || inner_dofs[global_row] {
            continue;
        }
        let mut row = a.row_mut(local_row);
        let (cols, vals) = row.cols_and_values_mut();
        for (&col, val) in cols.iter().zip(vals.iter_mut()) {
            *val = if col == global_row { T::one() } else { T::zero() };
        }
    }
}

/// Temperature field tied to the proxy it was computed on.
pub struct HeatSolution<'a, T: Real> {
    proxy: &'a MeshProxy<T>,
    temperature: DVector<T>,
}

impl<'a, T: Real> HeatSolution<'a, T> {
    pub fn new(proxy: &'a MeshProxy<T>, temperature: DVector<T>) -> Self {
        assert_eq!(temperature.len(), proxy.mesh().nodes_count());
        Self { proxy, temperature }
    }

    pub fn temperature(&self) -> &DVector<T> {
        &self.temperature
    }

    /// `integral(u)` over the mesh.
    pub fn energy(&self) -> T {
        self.proxy.integrate_solution(self.temperature.as_slice())
    }

    /// Per-node averaged temperature gradient.
    pub fn gradient(&self) -> [Vec<T>; 2] {
        self.proxy.gradient(self.temperature.as_slice())
    }

    pub fn save_as_vtk(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        io::vtk::save_as_vtk(
            path,
            self.proxy.mesh(),
            &[("Temperature", self.temperature.as_slice())],
        )
    }

    /// Writes `T.csv`, `Tx.csv` and `Ty.csv` under the given directory.
    pub fn save_raw_csv(&self, directory: impl AsRef<Path>) -> std::io::Result<()> {
        let directory = directory.as_ref();
        let [tx, ty] = self.gradient();
        io::csv::save_as_csv(directory.join("T.csv"), self.proxy.mesh(), self.temperature.as_slice())?;
        io::csv::save_as_csv(directory.join("Tx.csv"), self.proxy.mesh(), &tx)?;
        io::csv::save_as_csv(directory.join("Ty.csv"), self.proxy.mesh(), &ty)
    }
}
