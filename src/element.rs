//! Reference element catalog: shape functions in reference coordinates and
//! precomputed per-quadrature tables.
//!
//! Elements form a closed set of tagged kinds. Dispatch happens at
//! element-iteration granularity; the inner integration loops read the
//! precomputed tables `qN`, `qNxi`, `qNeta` with O(1) access. The tables are
//! evaluated at reference quadrature points and do *not* include the
//! geometric Jacobian, which is applied on the fly against per-element
//! Jacobi matrices.

use crate::quadrature::GaussRule;
use crate::Real;
use serde::{Deserialize, Serialize};

mod quadrilateral;
mod segment;
mod triangle;

/// One-dimensional element kinds (boundary elements of 2D meshes, or the
/// element of a 1D mesh).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind1d {
    Linear,
    Quadratic,
}

impl ElementKind1d {
    pub const ALL: [ElementKind1d; 2] = [ElementKind1d::Linear, ElementKind1d::Quadratic];

    pub fn nodes_count(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Quadratic => 3,
        }
    }

    /// Reference coordinate of the i-th node on `[-1, 1]`.
    pub fn node<T: Real>(&self, i: usize) -> T {
        match self {
            Self::Linear => segment::linear_node(i),
            Self::Quadratic => segment::quadratic_node(i),
        }
    }

    /// The i-th shape function at `xi`.
    pub fn n<T: Real>(&self, i: usize, xi: T) -> T {
        match self {
            Self::Linear => segment::linear_n(i, xi),
            Self::Quadratic => segment::quadratic_n(i, xi),
        }
    }

    /// Derivative of the i-th shape function at `xi`.
    pub fn n_xi<T: Real>(&self, i: usize, xi: T) -> T {
        match self {
            Self::Linear => segment::linear_n_xi(i, xi),
            Self::Quadratic => segment::quadratic_n_xi(i, xi),
        }
    }
}

/// Two-dimensional element kinds.
///
/// Node orderings are counter-clockwise with mid-side nodes interleaved
/// (corners sit at even local indices on the serendipity and Lagrange
/// quads; the Lagrange centre node comes last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind2d {
    Triangle,
    QuadraticTriangle,
    Bilinear,
    QuadraticSerendipity,
    QuadraticLagrange,
    CubicSerendipity,
}

impl ElementKind2d {
    pub const ALL: [ElementKind2d; 6] = [
        ElementKind2d::Triangle,
        ElementKind2d::QuadraticTriangle,
        ElementKind2d::Bilinear,
        ElementKind2d::QuadraticSerendipity,
        ElementKind2d::QuadraticLagrange,
        ElementKind2d::CubicSerendipity,
    ];

    pub fn nodes_count(&self) -> usize {
        match self {
            Self::Triangle => 3,
            Self::QuadraticTriangle => 6,
            Self::Bilinear => 4,
            Self::QuadraticSerendipity => 8,
            Self::QuadraticLagrange => 9,
            Self::CubicSerendipity => 12,
        }
    }

    /// Whether the reference domain is the unit triangle rather than the
    /// biunit square.
    pub fn is_simplex(&self) -> bool {
        matches!(self, Self::Triangle | Self::QuadraticTriangle)
    }

    /// Reference coordinates of the i-th node.
    pub fn node<T: Real>(&self, i: usize) -> (T, T) {
        match self {
            Self::Triangle => triangle::linear_node(i),
            Self::QuadraticTriangle => triangle::quadratic_node(i),
            Self::Bilinear => quadrilateral::bilinear_node(i),
            Self::QuadraticSerendipity => quadrilateral::serendipity_node(i),
            Self::QuadraticLagrange => quadrilateral::lagrange_node(i),
            Self::CubicSerendipity => quadrilateral::cubic_node(i),
        }
    }

    /// The i-th shape function at `(xi, eta)`.
    pub fn n<T: Real>(&self, i: usize, xi: T, eta: T) -> T {
        match self {
            Self::Triangle => triangle::linear_n(i, xi, eta),
            Self::QuadraticTriangle => triangle::quadratic_n(i, xi, eta),
            Self::Bilinear => quadrilateral::bilinear_n(i, xi, eta),
            Self::QuadraticSerendipity => quadrilateral::serendipity_n(i, xi, eta),
            Self::QuadraticLagrange => quadrilateral::lagrange_n(i, xi, eta),
            Self::CubicSerendipity => quadrilateral::cubic_n(i, xi, eta),
        }
    }

    pub fn n_xi<T: Real>(&self, i: usize, xi: T, eta: T) -> T {
        match self {
            Self::Triangle => triangle::linear_n_xi(i),
            Self::QuadraticTriangle => triangle::quadratic_n_xi(i, xi, eta),
            Self::Bilinear => quadrilateral::bilinear_n_xi(i, xi, eta),
            Self::QuadraticSerendipity => quadrilateral::serendipity_n_xi(i, xi, eta),
            Self::QuadraticLagrange => quadrilateral::lagrange_n_xi(i, xi, eta),
            Self::CubicSerendipity => quadrilateral::cubic_n_xi(i, xi, eta),
        }
    }

    pub fn n_eta<T: Real>(&self, i: usize, xi: T, eta: T) -> T {
        match self {
            Self::Triangle => triangle::linear_n_eta(i),
            Self::QuadraticTriangle => triangle::quadratic_n_eta(i, xi, eta),
            Self::Bilinear => quadrilateral::bilinear_n_eta(i, xi, eta),
            Self::QuadraticSerendipity => quadrilateral::serendipity_n_eta(i, xi, eta),
            Self::QuadraticLagrange => quadrilateral::lagrange_n_eta(i, xi, eta),
            Self::CubicSerendipity => quadrilateral::cubic_n_eta(i, xi, eta),
        }
    }
}

/// A 1D reference element with tables evaluated at remapped quadrature nodes.
#[derive(Debug, Clone)]
pub struct ReferenceElement1d<T> {
    kind: ElementKind1d,
    weights: Vec<T>,
    points: Vec<T>,
    n_table: Vec<T>,
    n_xi_table: Vec<T>,
}

impl<T: Real> ReferenceElement1d<T> {
    /// Builds the tables by affinely remapping the incoming quadrature to the
    /// element's reference interval. The remap here is the identity (both
    /// domains are `[-1, 1]`), so only the table evaluation remains; the form
    /// mirrors the 2D construction.
    pub fn from_quadrature(kind: ElementKind1d, quad: &GaussRule<T>) -> Self {
        let nodes = kind.nodes_count();
        let qnodes = quad.len();
        let mut weights = Vec::with_capacity(qnodes);
        let mut points = Vec::with_capacity(qnodes);
        for q in 0..qnodes {
            points.push(quad.point(q));
            weights.push(quad.weight(q));
        }
        let mut n_table = vec![T::zero(); nodes * qnodes];
        let mut n_xi_table = vec![T::zero(); nodes * qnodes];
        for i in 0..nodes {
            for q in 0..qnodes {
                n_table[i * qnodes + q] = kind.n(i, points[q]);
                n_xi_table[i * qnodes + q] = kind.n_xi(i, points[q]);
            }
        }
        Self {
            kind,
            weights,
            points,
            n_table,
            n_xi_table,
        }
    }

    pub fn kind(&self) -> ElementKind1d {
        self.kind
    }

    pub fn nodes_count(&self) -> usize {
        self.kind.nodes_count()
    }

    pub fn qnodes_count(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn weight(&self, q: usize) -> T {
        self.weights[q]
    }

    /// Reference coordinate of the q-th quadrature node.
    #[inline]
    pub fn qpoint(&self, q: usize) -> T {
        self.points[q]
    }

    #[inline]
    pub fn q_n(&self, i: usize, q: usize) -> T {
        self.n_table[i * self.qnodes_count() + q]
    }

    #[inline]
    pub fn q_n_xi(&self, i: usize, q: usize) -> T {
        self.n_xi_table[i * self.qnodes_count() + q]
    }
}

/// Second and third reference derivatives, precomputed only for the cubic
/// serendipity kind.
#[derive(Debug, Clone)]
pub struct ExtendedDerivatives<T> {
    pub n_xi2: Vec<T>,
    pub n_xieta: Vec<T>,
    pub n_eta2: Vec<T>,
    pub n_xi3: Vec<T>,
    pub n_xi2eta: Vec<T>,
    pub n_xieta2: Vec<T>,
    pub n_eta3: Vec<T>,
}

/// A 2D reference element with tables evaluated at remapped quadrature nodes.
#[derive(Debug, Clone)]
pub struct ReferenceElement2d<T> {
    kind: ElementKind2d,
    qnodes: usize,
    weights: Vec<T>,
    n_table: Vec<T>,
    n_xi_table: Vec<T>,
    n_eta_table: Vec<T>,
    extended: Option<Box<ExtendedDerivatives<T>>>,
}

impl<T: Real> ReferenceElement2d<T> {
    /// Builds the tables from the cartesian product of `quad` with itself.
    ///
    /// The incoming rule lives on `[-1, 1]`. For square kinds it is remapped
    /// affinely in both directions; for triangle kinds the eta direction is
    /// collapsed onto `[0, 1 - xi]`, whose xi-dependent half-length enters
    /// the folded weights. Either way the weights sum to the reference-domain
    /// measure.
    pub fn from_quadrature(kind: ElementKind2d, quad: &GaussRule<T>) -> Self {
        let half = T::from_f64(0.5).unwrap();
        let one = T::one();

        let (xi_lo, xi_hi) = if kind.is_simplex() {
            (T::zero(), one)
        } else {
            (-one, one)
        };
        let eta_bounds = |xi: T| -> (T, T) {
            if kind.is_simplex() {
                (T::zero(), one - xi)
            } else {
                (-one, one)
            }
        };

        let nq1 = quad.len();
        let qnodes = nq1 * nq1;
        let j_xi = (xi_hi - xi_lo) * half;

        let mut weights = vec![T::zero(); qnodes];
        let mut xi_coords = vec![T::zero(); qnodes];
        let mut eta_coords = vec![T::zero(); qnodes];
        for i in 0..nq1 {
            let xi = xi_lo + (quad.point(i) + one) * j_xi;
            let (eta_lo, eta_hi) = eta_bounds(xi);
            let j_eta = (eta_hi - eta_lo) * half;
            for j in 0..nq1 {
                let eta = eta_lo + (quad.point(j) + one) * j_eta;
                let q = i * nq1 + j;
                xi_coords[q] = xi;
                eta_coords[q] = eta;
                weights[q] = quad.weight(i) * j_xi * quad.weight(j) * j_eta;
            }
        }

        let nodes = kind.nodes_count();
        let mut n_table = vec![T::zero(); nodes * qnodes];
        let mut n_xi_table = vec![T::zero(); nodes * qnodes];
        let mut n_eta_table = vec![T::zero(); nodes * qnodes];
        for i in 0..nodes {
            for q in 0..qnodes {
                let (xi, eta) = (xi_coords[q], eta_coords[q]);
                n_table[i * qnodes + q] = kind.n(i, xi, eta);
                n_xi_table[i * qnodes + q] = kind.n_xi(i, xi, eta);
                n_eta_table[i * qnodes + q] = kind.n_eta(i, xi, eta);
            }
        }

        let extended = (kind == ElementKind2d::CubicSerendipity).then(|| {
            let mut ext = ExtendedDerivatives {
                n_xi2: vec![T::zero(); nodes * qnodes],
                n_xieta: vec![T::zero(); nodes * qnodes],
                n_eta2: vec![T::zero(); nodes * qnodes],
                n_xi3: vec![T::zero(); nodes * qnodes],
                n_xi2eta: vec![T::zero(); nodes * qnodes],
                n_xieta2: vec![T::zero(); nodes * qnodes],
                n_eta3: vec![T::zero(); nodes * qnodes],
            };
            for i in 0..nodes {
                for q in 0..qnodes {
                    let (xi, eta) = (xi_coords[q], eta_coords[q]);
                    let idx = i * qnodes + q;
                    ext.n_xi2[idx] = quadrilateral::cubic_n_xi2(i, xi, eta);
                    ext.n_xieta[idx] = quadrilateral::cubic_n_xieta(i, xi, eta);
                    ext.n_eta2[idx] = quadrilateral::cubic_n_eta2(i, xi, eta);
                    ext.n_xi3[idx] = quadrilateral::cubic_n_xi3(i, xi, eta);
                    ext.n_xi2eta[idx] = quadrilateral::cubic_n_xi2eta(i, xi, eta);
                    ext.n_xieta2[idx] = quadrilateral::cubic_n_xieta2(i, xi, eta);
                    ext.n_eta3[idx] = quadrilateral::cubic_n_eta3(i, xi, eta);
                }
            }
            Box::new(ext)
        });

        Self {
            kind,
            qnodes,
            weights,
            n_table,
            n_xi_table,
            n_eta_table,
            extended,
        }
    }

    pub fn kind(&self) -> ElementKind2d {
        self.kind
    }

    pub fn nodes_count(&self) -> usize {
        self.kind.nodes_count()
    }

    pub fn qnodes_count(&self) -> usize {
        self.qnodes
    }

    #[inline]
    pub fn weight(&self, q: usize) -> T {
        self.weights[q]
    }

    #[inline]
    pub fn q_n(&self, i: usize, q: usize) -> T {
        self.n_table[i * self.qnodes + q]
    }

    #[inline]
    pub fn q_n_xi(&self, i: usize, q: usize) -> T {
        self.n_xi_table[i * self.qnodes + q]
    }

    #[inline]
    pub fn q_n_eta(&self, i: usize, q: usize) -> T {
        self.n_eta_table[i * self.qnodes + q]
    }

    /// Higher-order derivative tables; `Some` only for the cubic
    /// serendipity kind.
    pub fn extended(&self) -> Option<&ExtendedDerivatives<T>> {
        self.extended.as_deref()
    }
}

/// Default Gauss order for each 1D kind.
fn default_order_1d(kind: ElementKind1d) -> usize {
    match kind {
        ElementKind1d::Linear => 2,
        ElementKind1d::Quadratic => 3,
    }
}

/// Default Gauss order for each 2D kind.
fn default_order_2d(kind: ElementKind2d) -> usize {
    match kind {
        ElementKind2d::Triangle | ElementKind2d::Bilinear => 2,
        ElementKind2d::QuadraticTriangle
        | ElementKind2d::QuadraticSerendipity
        | ElementKind2d::QuadraticLagrange => 3,
        ElementKind2d::CubicSerendipity => 4,
    }
}

/// Holds one precomputed reference element per kind.
///
/// Immutable after construction, except for explicit `set` rebuilds with a
/// caller-supplied quadrature.
#[derive(Debug, Clone)]
pub struct ElementCatalog<T> {
    segments: Vec<ReferenceElement1d<T>>,
    planes: Vec<ReferenceElement2d<T>>,
}

impl<T: Real> ElementCatalog<T> {
    pub fn new() -> Self {
        let segments = ElementKind1d::ALL
            .iter()
            .map(|&kind| ReferenceElement1d::from_quadrature(kind, &GaussRule::gauss(default_order_1d(kind))))
            .collect();
        let planes = ElementKind2d::ALL
            .iter()
            .map(|&kind| ReferenceElement2d::from_quadrature(kind, &GaussRule::gauss(default_order_2d(kind))))
            .collect();
        Self { segments, planes }
    }

    pub fn element_1d(&self, kind: ElementKind1d) -> &ReferenceElement1d<T> {
        &self.segments[kind as usize]
    }

    pub fn element_2d(&self, kind: ElementKind2d) -> &ReferenceElement2d<T> {
        &self.planes[kind as usize]
    }

    /// Rebuilds the tables of a 1D kind from the given quadrature.
    pub fn set_1d(&mut self, kind: ElementKind1d, quad: &GaussRule<T>) {
        self.segments[kind as usize] = ReferenceElement1d::from_quadrature(kind, quad);
    }

    /// Rebuilds the tables of a 2D kind from the given quadrature.
    pub fn set_2d(&mut self, kind: ElementKind2d, quad: &GaussRule<T>) {
        self.planes[kind as usize] = ReferenceElement2d::from_quadrature(kind, quad);
    }
}

impl<T: Real> Default for ElementCatalog<T> {
    fn default() -> Self {
        Self::new()
    }
}
