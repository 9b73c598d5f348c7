//! Static plane-stress elasticity with the mixed local-nonlocal material
//! model. Shares the assembly engine with the heat path; projections and
//! forms range over the X and Y displacement components.

use crate::assembly::{self, CsrPairAssembler, SystemMatrices};
use crate::bc::{self, BoundaryCondition};
use crate::element::ReferenceElement2d;
use crate::io;
use crate::mesh::proxy::MeshProxy;
use crate::solve::{self, Algorithm};
use crate::{Error, Real, Result};
use nalgebra::{DVector, Matrix2, Point2, SMatrix, SVector, Vector2};
use std::path::Path;

/// Material and model parameters (plane stress).
#[derive(Debug, Clone, Copy)]
pub struct ElasticityParameters<T> {
    pub young: T,
    pub poisson: T,
    pub local_weight: T,
    pub nonlocal_radius: T,
}

impl<T: Real> ElasticityParameters<T> {
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
        let half = T::from_f64(0.5).unwrap();
        if self.poisson <= -T::one() || self.poisson >= half {
            return Err(Error::ConfigInvalid(
                "Poisson ratio must lie in (-1, 0.5)".to_string(),
            ));
        }
        Ok(())
    }

    /// Plane-stress coefficients `(D0, D1, D2)`.
    pub fn hooke(&self) -> [T; 3] {
        let half = T::from_f64(0.5).unwrap();
        let denominator = T::one() - self.poisson * self.poisson;
        [
            self.young / denominator,
            self.poisson * self.young / denominator,
            half * self.young / (T::one() + self.poisson),
        ]
    }
}

pub struct StaticSolver<'a, T: Real> {
    proxy: Option<&'a MeshProxy<T>>,
    algorithm: Algorithm,
}

impl<'a, T> StaticSolver<'a, T>
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

    pub fn stationary<F, W>(
        &self,
        parameters: &ElasticityParameters<T>,
        conditions: &[BoundaryCondition<T, 2>],
        right_part: F,
        influence: W,
    ) -> Result<ElasticitySolution<'a, T>>
    where
        F: Fn(&Point2<T>) -> Vector2<T> + Sync,
        W: Fn(&Point2<T>, &Point2<T>) -> T + Sync,
    {
        let proxy = self.proxy()?;
        parameters.validate()?;

        let neumann = bc::is_pure_neumann(conditions);
        if neumann {
            bc::check_neumann_compatibility(proxy, conditions)?;
        }

        let matrices = self.stiffness_matrices(proxy, parameters, conditions, &influence, neumann)?;

        let mut f = vec![T::zero(); matrices.inner.nrows()];
        assembly::integrate_right_part::<_, _, _, 2>(&mut f, proxy, |e, i| {
            integrate_vector_function(proxy, e, i, &right_part)
        });
        bc::apply_second_kind(proxy, conditions, &mut f);
        bc::apply_first_kind(proxy, conditions, &matrices.bound, &mut f);

        let f = DVector::from_vec(f);
        let algorithm = if neumann { Algorithm::DenseLu } else { self.algorithm };
        let solution = solve::solve_symmetric_upper(&matrices.inner, &f, None, algorithm)?;

        let dofs = 2 * proxy.mesh().nodes_count();
        let displacement = DVector::from_iterator(dofs, solution.iter().take(dofs).copied());
        Ok(ElasticitySolution {
            proxy,
            displacement,
            parameters: *parameters,
        })
    }

    fn stiffness_matrices<W>(
        &self,
        proxy: &'a MeshProxy<T>,
        parameters: &ElasticityParameters<T>,
        conditions: &[BoundaryCondition<T, 2>],
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
        let assembler = CsrPairAssembler::<_, 2>::new(proxy, inner_dofs, neumann)?;

        let d = parameters.hooke();
        let p1 = parameters.local_weight;
        let p2 = T::one() - p1;
        assembler.assemble(
            nonlocal,
            |e, i, j| integrate_loc_block(proxy, &d, e, i, j) * p1,
            |e_l, e_nl, i_l, j_nl| {
                integrate_nonloc_block(proxy, &d, influence, e_l, e_nl, i_l, j_nl) * p2
            },
            |e, i| crate::heat::integrate_basic(proxy, e, i),
        )
    }
}

#[inline]
fn cofactor_derivatives<T: Real>(el: &ReferenceElement2d<T>, i: usize, q: usize, j: &Matrix2<T>) -> (T, T) {
    let dx = el.q_n_xi(i, q) * j[(1, 1)] - el.q_n_eta(i, q) * j[(1, 0)];
    let dy = -el.q_n_xi(i, q) * j[(0, 1)] + el.q_n_eta(i, q) * j[(0, 0)];
    (dx, dy)
}

/// Local plane-stress block for the pair `(i, j)` on element `e`: rows are
/// the projection component, columns the form component.
fn integrate_loc_block<T: Real>(
    proxy: &MeshProxy<T>,
    d: &[T; 3],
    e: usize,
    i: usize,
    j: usize,
) -> SMatrix<T, 2, 2> {
    let el = proxy.element_2d(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut block = SMatrix::<T, 2, 2>::zeros();
    for q in 0..el.qnodes_count() {
        let j_m = &jacobi[q];
        let det = MeshProxy::jacobian(j_m);
        let (dxi, dyi) = cofactor_derivatives(el, i, q, j_m);
        let (dxj, dyj) = cofactor_derivatives(el, j, q, j_m);
        let w = el.weight(q) / det;
        block[(0, 0)] += w * (d[0] * dxi * dxj + d[2] * dyi * dyj);
        block[(0, 1)] += w * (d[1] * dxi * dyj + d[2] * dyi * dxj);
        block[(1, 0)] += w * (d[1] * dyi * dxj + d[2] * dxi * dyj);
        block[(1, 1)] += w * (d[0] * dyi * dyj + d[2] * dxi * dxj);
    }
    block
}

/// Nonlocal plane-stress block between the element pair `(eL, eNL)`.
fn integrate_nonloc_block<T: Real, W>(
    proxy: &MeshProxy<T>,
    d: &[T; 3],
    influence: &W,
    e_l: usize,
    e_nl: usize,
    i_l: usize,
    j_nl: usize,
) -> SMatrix<T, 2, 2>
where
    W: Fn(&Point2<T>, &Point2<T>) -> T,
{
    let el_l = proxy.element_2d(e_l);
    let el_nl = proxy.element_2d(e_nl);
    let coords_l = proxy.quad_coords(e_l);
    let coords_nl = proxy.quad_coords(e_nl);
    let jacobi_l = proxy.jacobi_matrices(e_l);
    let jacobi_nl = proxy.jacobi_matrices(e_nl);

    let mut block = SMatrix::<T, 2, 2>::zeros();
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
        let w = el_l.weight(q_l);
        block[(0, 0)] += w * (d[0] * gx * dxi + d[2] * gy * dyi);
        block[(0, 1)] += w * (d[1] * gy * dxi + d[2] * gx * dyi);
        block[(1, 0)] += w * (d[1] * gx * dyi + d[2] * gy * dxi);
        block[(1, 1)] += w * (d[0] * gy * dyi + d[2] * gx * dxi);
    }
    block
}

/// `integral(N_i f_c(x) |det J|)` for both displacement components.
fn integrate_vector_function<T: Real, F>(
    proxy: &MeshProxy<T>,
    e: usize,
    i: usize,
    f: &F,
) -> SVector<T, 2>
where
    F: Fn(&Point2<T>) -> Vector2<T>,
{
    let el = proxy.element_2d(e);
    let coords = proxy.quad_coords(e);
    let jacobi = proxy.jacobi_matrices(e);
    let mut integral = SVector::<T, 2>::zeros();
    for q in 0..el.qnodes_count() {
        let scale = el.weight(q) * el.q_n(i, q) * MeshProxy::jacobian(&jacobi[q]);
        let value = f(&coords[q]);
        integral[0] += scale * value[0];
        integral[1] += scale * value[1];
    }
    integral
}

/// Strain and stress components at the mesh nodes, Voigt-ordered
/// `(xx, yy, xy)`.
pub struct StrainStressField<T> {
    pub strain: [Vec<T>; 3],
    pub stress: [Vec<T>; 3],
}

/// Displacement field tied to the proxy it was computed on.
pub struct ElasticitySolution<'a, T: Real> {
    proxy: &'a MeshProxy<T>,
    displacement: DVector<T>,
    parameters: ElasticityParameters<T>,
}

impl<'a, T: Real> ElasticitySolution<'a, T> {
    pub fn displacement(&self) -> &DVector<T> {
        &self.displacement
    }

    /// Recovers nodal strains and stresses. The local part is averaged over
    /// the elements incident on each node; when the nonlocal weight is
    /// active the stress is blended with the influence-weighted average
    /// over the node's neighbourhood.
    pub fn strains_and_stresses<W>(&self, influence: W) -> StrainStressField<T>
    where
        W: Fn(&Point2<T>, &Point2<T>) -> T,
    {
        let mut field = self.local_strains_and_stresses();
        if assembly::is_nonlocal(self.parameters.local_weight) {
            let p1 = self.parameters.local_weight;
            for component in &mut field.stress {
                for value in component.iter_mut() {
                    *value *= p1;
                }
            }
            self.nonlocal_stress(&mut field, influence);
        }
        field
    }

    fn local_strains_and_stresses(&self) -> StrainStressField<T> {
        let proxy = self.proxy;
        let mesh = proxy.mesh();
        let nodes_count = mesh.nodes_count();
        let d = self.parameters.hooke();
        let u = &self.displacement;

        let mut strain = [
            vec![T::zero(); nodes_count],
            vec![T::zero(); nodes_count],
            vec![T::zero(); nodes_count],
        ];
        let mut stress = [
            vec![T::zero(); nodes_count],
            vec![T::zero(); nodes_count],
            vec![T::zero(); nodes_count],
        ];
        let mut repeats = vec![0usize; nodes_count];

        for e in 0..mesh.elements_count() {
            let kind = mesh.element_kind(e);
            for i in 0..kind.nodes_count() {
                let (xi, eta) = kind.node::<T>(i);

                let mut j = Matrix2::zeros();
                for l in 0..kind.nodes_count() {
                    let p = mesh.node(mesh.node_number(e, l));
                    let d_xi = kind.n_xi(l, xi, eta);
                    let d_eta = kind.n_eta(l, xi, eta);
                    j[(0, 0)] += p.x * d_xi;
                    j[(0, 1)] += p.x * d_eta;
                    j[(1, 0)] += p.y * d_xi;
                    j[(1, 1)] += p.y * d_eta;
                }
                let det = j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)];

                let mut eps = [T::zero(); 3];
                for l in 0..kind.nodes_count() {
                    let d_xi = kind.n_xi(l, xi, eta);
                    let d_eta = kind.n_eta(l, xi, eta);
                    let dx = (d_xi * j[(1, 1)] - d_eta * j[(1, 0)]) / det;
                    let dy = (-d_xi * j[(0, 1)] + d_eta * j[(0, 0)]) / det;
                    let node = mesh.node_number(e, l);
                    eps[0] += dx * u[2 * node];
                    eps[1] += dy * u[2 * node + 1];
                    eps[2] += dy * u[2 * node] + dx * u[2 * node + 1];
                }

                let node = mesh.node_number(e, i);
                strain[0][node] += eps[0];
                strain[1][node] += eps[1];
                strain[2][node] += eps[2];
                stress[0][node] += d[0] * eps[0] + d[1] * eps[1];
                stress[1][node] += d[1] * eps[0] + d[0] * eps[1];
                stress[2][node] += d[2] * eps[2];
                repeats[node] += 1;
            }
        }

        let half = T::from_f64(0.5).unwrap();
        for node in 0..nodes_count {
            let scale = T::one() / T::from_usize(repeats[node].max(1)).unwrap();
            strain[0][node] *= scale;
            strain[1][node] *= scale;
            strain[2][node] *= scale * half;
            stress[0][node] *= scale;
            stress[1][node] *= scale;
            stress[2][node] *= scale * half;
        }

        StrainStressField { strain, stress }
    }

    fn nonlocal_stress<W>(&self, field: &mut StrainStressField<T>, influence: W)
    where
        W: Fn(&Point2<T>, &Point2<T>) -> T,
    {
        let proxy = self.proxy;
        let mesh = proxy.mesh();
        let d = self.parameters.hooke();
        let p2 = T::one() - self.parameters.local_weight;

        // Strains approximated at every quadrature node from the nodal field.
        let total_qnodes = proxy.quad_shift(mesh.elements_count());
        let mut eps_q = [
            vec![T::zero(); total_qnodes],
            vec![T::zero(); total_qnodes],
            vec![T::zero(); total_qnodes],
        ];
        for e in 0..mesh.elements_count() {
            let el = proxy.element_2d(e);
            let shift = proxy.quad_shift(e);
            for q in 0..el.qnodes_count() {
                for i in 0..el.nodes_count() {
                    let node = mesh.node_number(e, i);
                    let weight = el.q_n(i, q);
                    eps_q[0][shift + q] += field.strain[0][node] * weight;
                    eps_q[1][shift + q] += field.strain[1][node] * weight;
                    eps_q[2][shift + q] += field.strain[2][node] * weight;
                }
            }
        }

        let mut neighborhood = Vec::new();
        for node in 0..mesh.nodes_count() {
            neighborhood.clear();
            for &e in proxy.node_elements(node) {
                neighborhood.extend_from_slice(proxy.neighbors(e));
            }
            neighborhood.sort_unstable();
            neighborhood.dedup();

            let x = mesh.node(node);
            for &e_nl in &neighborhood {
                let el = proxy.element_2d(e_nl);
                let coords = proxy.quad_coords(e_nl);
                let jacobi = proxy.jacobi_matrices(e_nl);
                let shift = proxy.quad_shift(e_nl);
                for q in 0..el.qnodes_count() {
                    let finit = p2
                        * el.weight(q)
                        * influence(x, &coords[q])
                        * MeshProxy::jacobian(&jacobi[q]);
                    field.stress[0][node] +=
                        finit * (d[0] * eps_q[0][shift + q] + d[1] * eps_q[1][shift + q]);
                    field.stress[1][node] +=
                        finit * (d[1] * eps_q[0][shift + q] + d[0] * eps_q[1][shift + q]);
                    field.stress[2][node] += finit * d[2] * eps_q[2][shift + q];
                }
            }
        }
    }

    /// Writes displacement, strain and stress fields to a legacy VTK file.
    pub fn save_as_vtk<W>(&self, path: impl AsRef<Path>, influence: W) -> std::io::Result<()>
    where
        W: Fn(&Point2<T>, &Point2<T>) -> T,
    {
        let nodes_count = self.proxy.mesh().nodes_count();
        let u_x: Vec<T> = (0..nodes_count).map(|i| self.displacement[2 * i]).collect();
        let u_y: Vec<T> = (0..nodes_count).map(|i| self.displacement[2 * i + 1]).collect();
        let field = self.strains_and_stresses(influence);
        io::vtk::save_as_vtk(
            path,
            self.proxy.mesh(),
            &[
                ("U_X", &u_x),
                ("U_Y", &u_y),
                ("EPS_XX", &field.strain[0]),
                ("EPS_YY", &field.strain[1]),
                ("EPS_XY", &field.strain[2]),
                ("SIGMA_XX", &field.stress[0]),
                ("SIGMA_YY", &field.stress[1]),
                ("SIGMA_XY", &field.stress[2]),
            ],
        )
    }

    /// Writes one CSV file per field under the given directory.
    pub fn save_raw_csv<W>(&self, directory: impl AsRef<Path>, influence: W) -> std::io::Result<()>
    where
        W: Fn(&Point2<T>, &Point2<T>) -> T,
    {
        let directory = directory.as_ref();
        let mesh = self.proxy.mesh();
        let nodes_count = mesh.nodes_count();
        let u_x: Vec<T> = (0..nodes_count).map(|i| self.displacement[2 * i]).collect();
        let u_y: Vec<T> = (0..nodes_count).map(|i| self.displacement[2 * i + 1]).collect();
        let field = self.strains_and_stresses(influence);
        io::csv::save_as_csv(directory.join("u_x.csv"), mesh, &u_x)?;
        io::csv::save_as_csv(directory.join("u_y.csv"), mesh, &u_y)?;
        io::csv::save_as_csv(directory.join("eps11.csv"), mesh, &field.strain[0])?;
        io::csv::save_as_csv(directory.join("eps22.csv"), mesh, &field.strain[1])?;
        io::csv::save_as_csv(directory.join("eps12.csv"), mesh, &field.strain[2])?;
        io::csv::save_as_csv(directory.join("sigma11.csv"), mesh, &field.stress[0])?;
        io::csv::save_as_csv(directory.join("sigma22.csv"), mesh, &field.stress[1])?;
        io::csv::save_as_csv(directory.join("sigma12.csv"), mesh, &field.stress[2])
    }
}
