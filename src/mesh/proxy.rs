//! Derived mesh tables consumed by the assembly engine and post-processors.

use crate::assembly::Topology;
use crate::element::{ElementCatalog, ReferenceElement1d, ReferenceElement2d};
use crate::mesh::Mesh2d;
use crate::{Error, Real, Result};
use nalgebra::{Matrix2, Point2, Vector2};
use rayon::prelude::*;
use std::collections::HashMap;

/// Trade-off between memory footprint and cache locality of the neighbour
/// search.
///
/// `Memory` keeps one neighbour list per element and streams quadrature
/// coordinates from the shared table; `Speed` duplicates the quadrature
/// coordinates per element into a flat cache so the pair-distance loops run
/// on contiguous storage. Both modes produce identical neighbour sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balancing {
    Memory,
    Speed,
}

/// Contiguous node-range partition of the mesh across cooperating processes.
///
/// The rank owning node `n` assembles all rows `DoF * n + c`. The default
/// partition owns every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub rank: usize,
    pub size: usize,
}

impl Default for Partition {
    fn default() -> Self {
        Self { rank: 0, size: 1 }
    }
}

impl Partition {
    /// The `[first, last)` node range owned by this rank; the remainder of
    /// an uneven split is spread over the leading ranks.
    pub fn node_range(&self, nodes_count: usize) -> (usize, usize) {
        assert!(self.size > 0 && self.rank < self.size, "invalid partition");
        let per_rank = nodes_count / self.size;
        let remainder = nodes_count % self.size;
        let first = self.rank * per_rank + self.rank.min(remainder);
        let count = per_rank + usize::from(self.rank < remainder);
        (first, first + count)
    }
}

/// Mesh proxy: owns the mesh and element catalog together with every derived
/// table the solvers need.
///
/// Immutable after construction, apart from the lazily triggered neighbour
/// search (`find_neighbours`), which is invoked before assembly whenever the
/// nonlocal weight is active.
#[derive(Debug)]
pub struct MeshProxy<T: Real> {
    mesh: Mesh2d<T>,
    catalog: ElementCatalog<T>,
    node_elements: Vec<Vec<usize>>,
    global_to_local: Vec<HashMap<usize, usize>>,
    quad_shifts: Vec<usize>,
    quad_coords: Vec<Point2<T>>,
    jacobi: Vec<Matrix2<T>>,
    bound_shifts: Vec<Vec<usize>>,
    bound_quad_coords: Vec<Vec<Point2<T>>>,
    bound_jacobi: Vec<Vec<Vector2<T>>>,
    neighbors: Option<Vec<Vec<usize>>>,
    first_node: usize,
    last_node: usize,
    partition: Partition,
}

impl<T: Real> MeshProxy<T> {
    pub fn new(mesh: Mesh2d<T>, catalog: ElementCatalog<T>) -> Result<Self> {
        Self::with_partition(mesh, catalog, Partition::default())
    }

    pub fn with_partition(mesh: Mesh2d<T>, catalog: ElementCatalog<T>, partition: Partition) -> Result<Self> {
        let node_elements = node_elements_map(&mesh);
        let global_to_local = global_to_local_numbering(&mesh);
        let quad_shifts = quadrature_shifts(&mesh, &catalog);
        let quad_coords = approx_all_quad_coords(&mesh, &catalog, &quad_shifts)?;
        let jacobi = approx_all_jacobi_matrices(&mesh, &catalog, &quad_shifts)?;

        let mut bound_shifts = Vec::with_capacity(mesh.boundary_groups_count());
        let mut bound_quad_coords = Vec::with_capacity(mesh.boundary_groups_count());
        let mut bound_jacobi = Vec::with_capacity(mesh.boundary_groups_count());
        for b in 0..mesh.boundary_groups_count() {
            let shifts = boundary_quadrature_shifts(&mesh, &catalog, b);
            let coords = approx_boundary_quad_coords(&mesh, &catalog, b, &shifts);
            let jacobi_1d = approx_boundary_jacobi(&mesh, &catalog, b, &shifts);
            bound_shifts.push(shifts);
            bound_quad_coords.push(coords);
            bound_jacobi.push(jacobi_1d);
        }

        let (first_node, last_node) = partition.node_range(mesh.nodes_count());
        Ok(Self {
            mesh,
            catalog,
            node_elements,
            global_to_local,
            quad_shifts,
            quad_coords,
            jacobi,
            bound_shifts,
            bound_quad_coords,
            bound_jacobi,
            neighbors: None,
            first_node,
            last_node,
            partition,
        })
    }

    pub fn mesh(&self) -> &Mesh2d<T> {
        &self.mesh
    }

    pub fn catalog(&self) -> &ElementCatalog<T> {
        &self.catalog
    }

    pub fn rank(&self) -> usize {
        self.partition.rank
    }

    pub fn size(&self) -> usize {
        self.partition.size
    }

    pub fn first_node(&self) -> usize {
        self.first_node
    }

    pub fn last_node(&self) -> usize {
        self.last_node
    }

    pub fn element_2d(&self, e: usize) -> &ReferenceElement2d<T> {
        self.catalog.element_2d(self.mesh.element_kind(e))
    }

    pub fn element_1d(&self, b: usize, e: usize) -> &ReferenceElement1d<T> {
        self.catalog.element_1d(self.mesh.boundary_group(b).elements[e].kind)
    }

    /// Elements incident on the given node.
    pub fn node_elements(&self, node: usize) -> &[usize] {
        &self.node_elements[node]
    }

    /// Local slot of a global node within element `e`.
    pub fn global_to_local(&self, e: usize, node: usize) -> usize {
        self.global_to_local[e][&node]
    }

    pub fn quad_shift(&self, e: usize) -> usize {
        self.quad_shifts[e]
    }

    /// Global coordinates of the quadrature nodes of element `e`.
    pub fn quad_coords(&self, e: usize) -> &[Point2<T>] {
        &self.quad_coords[self.quad_shifts[e]..self.quad_shifts[e + 1]]
    }

    /// Jacobi matrices at the quadrature nodes of element `e`.
    pub fn jacobi_matrices(&self, e: usize) -> &[Matrix2<T>] {
        &self.jacobi[self.quad_shifts[e]..self.quad_shifts[e + 1]]
    }

    /// Global coordinates of the quadrature nodes of boundary element `e`
    /// in group `b`.
    pub fn boundary_quad_coords(&self, b: usize, e: usize) -> &[Point2<T>] {
        let shifts = &self.bound_shifts[b];
        &self.bound_quad_coords[b][shifts[e]..shifts[e + 1]]
    }

    /// Jacobi columns at the quadrature nodes of boundary element `e` in
    /// group `b`.
    pub fn boundary_jacobi(&self, b: usize, e: usize) -> &[Vector2<T>] {
        let shifts = &self.bound_shifts[b];
        &self.bound_jacobi[b][shifts[e]..shifts[e + 1]]
    }

    /// `|det J|` of a 2x2 Jacobi matrix (area scaling).
    pub fn jacobian(j: &Matrix2<T>) -> T {
        (j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)]).abs()
    }

    /// `||J||_2` of a boundary Jacobi column (arc-length scaling).
    pub fn jacobian_1d(j: &Vector2<T>) -> T {
        (j[0] * j[0] + j[1] * j[1]).sqrt()
    }

    pub fn has_neighbors(&self) -> bool {
        self.neighbors.is_some()
    }

    /// Neighbour elements of `e` within the radius passed to
    /// `find_neighbours`, sorted ascending.
    ///
    /// # Panics
    ///
    /// Panics if the neighbour search has not been run.
    pub fn neighbors(&self, e: usize) -> &[usize] {
        &self
            .neighbors
            .as_ref()
            .expect("find_neighbours must be called before querying neighbours")[e]
    }

    /// Fills the per-element neighbour lists: `e2` neighbours `e` iff some
    /// pair of their quadrature nodes lies within distance `r`. The relation
    /// is undirected and each list is sorted and duplicate-free.
    pub fn find_neighbours(&mut self, r: T, balancing: Balancing)
    where
        T: Send + Sync,
    {
        let elements_count = self.mesh.elements_count();
        let r2 = r * r;

        // Bounding circles over each element's quadrature nodes prune the
        // pair tests.
        let mut centers = Vec::with_capacity(elements_count);
        let mut radii = Vec::with_capacity(elements_count);
        for e in 0..elements_count {
            let coords = self.quad_coords(e);
            let inv_len = T::one() / T::from_usize(coords.len()).unwrap();
            let mut center = Vector2::zeros();
            for p in coords {
                center += p.coords * inv_len;
            }
            let center = Point2::from(center);
            let radius = coords
                .iter()
                .map(|p| (*p - center).norm())
                .fold(T::zero(), |a, b| a.max(b));
            centers.push(center);
            radii.push(radius);
        }

        // In Speed mode every element gets its own copy of the quadrature
        // coordinates so the inner loops scan contiguous memory.
        let cache: Option<Vec<Vec<Point2<T>>>> = match balancing {
            Balancing::Memory => None,
            Balancing::Speed => Some(
                (0..elements_count)
                    .map(|e| self.quad_coords(e).to_vec())
                    .collect(),
            ),
        };

        let cache = &cache;
        let lists: Vec<Vec<usize>> = (0..elements_count)
            .into_par_iter()
            .map(|e| {
                let mut neighbors = Vec::new();
                let coords_e: &[Point2<T>] = match cache {
                    Some(cache) => &cache[e],
                    None => self.quad_coords(e),
                };
                for e2 in 0..elements_count {
                    let gap = (centers[e2] - centers[e]).norm();
                    if gap > r + radii[e] + radii[e2] {
                        continue;
                    }
                    let coords_e2: &[Point2<T>] = match cache {
                        Some(cache) => &cache[e2],
                        None => self.quad_coords(e2),
                    };
                    let close = coords_e.iter().any(|p| {
                        coords_e2
                            .iter()
                            .any(|p2| (*p2 - *p).norm_squared() <= r2)
                    });
                    if close {
                        neighbors.push(e2);
                    }
                }
                neighbors
            })
            .collect();

        let total: usize = lists.iter().map(Vec::len).sum();
        log::debug!(
            "neighbour search: {} pairs over {} elements",
            total,
            elements_count
        );
        self.neighbors = Some(lists);
    }

    /// Integral of a nodal field over the mesh.
    pub fn integrate_solution(&self, u: &[T]) -> T {
        assert_eq!(u.len(), self.mesh.nodes_count());
        let mut integral = T::zero();
        for e in 0..self.mesh.elements_count() {
            let el = self.element_2d(e);
            let jacobi = self.jacobi_matrices(e);
            for q in 0..el.qnodes_count() {
                let mut value = T::zero();
                for i in 0..el.nodes_count() {
                    value += el.q_n(i, q) * u[self.mesh.node_number(e, i)];
                }
                integral += el.weight(q) * value * Self::jacobian(&jacobi[q]);
            }
        }
        integral
    }

    /// Per-node averaged gradient of a nodal field.
    ///
    /// The gradient is evaluated at each element's own nodes through the
    /// pointwise shape-function derivatives and the nodal Jacobi matrix,
    /// then averaged over the elements incident on the node.
    pub fn gradient(&self, u: &[T]) -> [Vec<T>; 2] {
        assert_eq!(u.len(), self.mesh.nodes_count());
        let nodes_count = self.mesh.nodes_count();
        let mut du_dx = vec![T::zero(); nodes_count];
        let mut du_dy = vec![T::zero(); nodes_count];
        let mut repeats = vec![0usize; nodes_count];

        for e in 0..self.mesh.elements_count() {
            let kind = self.mesh.element_kind(e);
            for i in 0..kind.nodes_count() {
                let (xi, eta) = kind.node::<T>(i);

                let mut j = Matrix2::zeros();
                for l in 0..kind.nodes_count() {
                    let p = self.mesh.node(self.mesh.node_number(e, l));
                    let d_xi = kind.n_xi(l, xi, eta);
                    let d_eta = kind.n_eta(l, xi, eta);
                    j[(0, 0)] += p.x * d_xi;
                    j[(0, 1)] += p.x * d_eta;
                    j[(1, 0)] += p.y * d_xi;
                    j[(1, 1)] += p.y * d_eta;
                }
                let det = j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)];

                let mut gx = T::zero();
                let mut gy = T::zero();
                for l in 0..kind.nodes_count() {
                    let d_xi = kind.n_xi(l, xi, eta);
                    let d_eta = kind.n_eta(l, xi, eta);
                    let dx = d_xi * j[(1, 1)] - d_eta * j[(1, 0)];
                    let dy = -d_xi * j[(0, 1)] + d_eta * j[(0, 0)];
                    let ul = u[self.mesh.node_number(e, l)];
                    gx += dx * ul / det;
                    gy += dy * ul / det;
                }

                let node = self.mesh.node_number(e, i);
                du_dx[node] += gx;
                du_dy[node] += gy;
                repeats[node] += 1;
            }
        }

        for node in 0..nodes_count {
            let scale = T::one() / T::from_usize(repeats[node].max(1)).unwrap();
            du_dx[node] *= scale;
            du_dy[node] *= scale;
        }
        [du_dx, du_dy]
    }
}

impl<T: Real> Topology for MeshProxy<T> {
    fn nodes_count(&self) -> usize {
        self.mesh.nodes_count()
    }

    fn owned_range(&self) -> (usize, usize) {
        (self.first_node, self.last_node)
    }

    fn for_each_incident(&self, node: usize, f: &mut dyn FnMut(usize, usize)) {
        for &e in &self.node_elements[node] {
            f(e, self.global_to_local[e][&node]);
        }
    }

    fn element_nodes_count(&self, e: usize) -> usize {
        self.mesh.nodes_count_of(e)
    }

    fn node_number(&self, e: usize, i: usize) -> usize {
        self.mesh.node_number(e, i)
    }

    fn for_each_neighbor(&self, e: usize, f: &mut dyn FnMut(usize)) {
        for &e2 in self.neighbors(e) {
            f(e2);
        }
    }
}

fn node_elements_map<T: Real>(mesh: &Mesh2d<T>) -> Vec<Vec<usize>> {
    let mut node_elements = vec![Vec::new(); mesh.nodes_count()];
    for e in 0..mesh.elements_count() {
        for &node in &mesh.element(e).nodes {
            node_elements[node].push(e);
        }
    }
    node_elements
}

fn global_to_local_numbering<T: Real>(mesh: &Mesh2d<T>) -> Vec<HashMap<usize, usize>> {
    (0..mesh.elements_count())
        .map(|e| {
            mesh.element(e)
                .nodes
                .iter()
                .enumerate()
                .map(|(i, &node)| (node, i))
                .collect()
        })
        .collect()
}

fn quadrature_shifts<T: Real>(mesh: &Mesh2d<T>, catalog: &ElementCatalog<T>) -> Vec<usize> {
    let mut shifts = Vec::with_capacity(mesh.elements_count() + 1);
    shifts.push(0);
    for e in 0..mesh.elements_count() {
        let qnodes = catalog.element_2d(mesh.element_kind(e)).qnodes_count();
        shifts.push(shifts[e] + qnodes);
    }
    shifts
}

fn check_shifts(elements_count: usize, shifts: &[usize]) -> Result<()> {
    if shifts.len() != elements_count + 1 {
        return Err(Error::ShapeMismatch {
            expected: elements_count + 1,
            found: shifts.len(),
        });
    }
    Ok(())
}

fn approx_all_quad_coords<T: Real>(
    mesh: &Mesh2d<T>,
    catalog: &ElementCatalog<T>,
    shifts: &[usize],
) -> Result<Vec<Point2<T>>> {
    check_shifts(mesh.elements_count(), shifts)?;
    let mut coords = vec![Point2::origin(); *shifts.last().unwrap()];
    for e in 0..mesh.elements_count() {
        let el = catalog.element_2d(mesh.element_kind(e));
        for q in 0..el.qnodes_count() {
            let mut p = Vector2::zeros();
            for i in 0..el.nodes_count() {
                p += mesh.node(mesh.node_number(e, i)).coords * el.q_n(i, q);
            }
            coords[shifts[e] + q] = Point2::from(p);
        }
    }
    Ok(coords)
}

fn approx_all_jacobi_matrices<T: Real>(
    mesh: &Mesh2d<T>,
    catalog: &ElementCatalog<T>,
    shifts: &[usize],
) -> Result<Vec<Matrix2<T>>> {
    check_shifts(mesh.elements_count(), shifts)?;
    let mut jacobi = vec![Matrix2::zeros(); *shifts.last().unwrap()];
    for e in 0..mesh.elements_count() {
        let el = catalog.element_2d(mesh.element_kind(e));
        for q in 0..el.qnodes_count() {
            let j = &mut jacobi[shifts[e] + q];
            for i in 0..el.nodes_count() {
                let p = mesh.node(mesh.node_number(e, i));
                j[(0, 0)] += p.x * el.q_n_xi(i, q);
                j[(0, 1)] += p.x * el.q_n_eta(i, q);
                j[(1, 0)] += p.y * el.q_n_xi(i, q);
                j[(1, 1)] += p.y * el.q_n_eta(i, q);
            }
        }
    }
    Ok(jacobi)
}

fn boundary_quadrature_shifts<T: Real>(mesh: &Mesh2d<T>, catalog: &ElementCatalog<T>, b: usize) -> Vec<usize> {
    let group = mesh.boundary_group(b);
    let mut shifts = Vec::with_capacity(group.elements.len() + 1);
    shifts.push(0);
    for (e, element) in group.elements.iter().enumerate() {
        shifts.push(shifts[e] + catalog.element_1d(element.kind).qnodes_count());
    }
    shifts
}

fn approx_boundary_quad_coords<T: Real>(
    mesh: &Mesh2d<T>,
    catalog: &ElementCatalog<T>,
    b: usize,
    shifts: &[usize],
) -> Vec<Point2<T>> {
    let group = mesh.boundary_group(b);
    let mut coords = vec![Point2::origin(); *shifts.last().unwrap()];
    for (e, element) in group.elements.iter().enumerate() {
        let el = catalog.element_1d(element.kind);
        for q in 0..el.qnodes_count() {
            let mut p = Vector2::zeros();
            for i in 0..el.nodes_count() {
                p += mesh.node(element.nodes[i]).coords * el.q_n(i, q);
            }
            coords[shifts[e] + q] = Point2::from(p);
        }
    }
    coords
}

fn approx_boundary_jacobi<T: Real>(
    mesh: &Mesh2d<T>,
    catalog: &ElementCatalog<T>,
    b: usize,
    shifts: &[usize],
) -> Vec<Vector2<T>> {
    let group = mesh.boundary_group(b);
    let mut jacobi = vec![Vector2::zeros(); *shifts.last().unwrap()];
    for (e, element) in group.elements.iter().enumerate() {
        let el = catalog.element_1d(element.kind);
        for q in 0..el.qnodes_count() {
            let j = &mut jacobi[shifts[e] + q];
            for i in 0..el.nodes_count() {
                let p = mesh.node(element.nodes[i]);
                j[0] += p.x * el.q_n_xi(i, q);
                j[1] += p.y * el.q_n_xi(i, q);
            }
        }
    }
    jacobi
}
