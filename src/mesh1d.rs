//! Uniform one-dimensional mesh over a segment.
//!
//! All elements share one reference element of the configured order, the
//! geometric map is affine with constant Jacobian `h / 2`, and the nonlocal
//! neighbour relation reduces to a contiguous element range per element.

use crate::assembly::Topology;
use crate::element::{ElementKind1d, ReferenceElement1d};
use crate::quadrature::GaussRule;
use crate::{Error, Real, Result};

#[derive(Debug)]
pub struct Mesh1d<T: Real> {
    element: ReferenceElement1d<T>,
    section: [T; 2],
    elements_count: usize,
    step: T,
    jacobian: T,
    neighbor_ranges: Option<Vec<(usize, usize)>>,
}

impl<T: Real> Mesh1d<T> {
    /// Builds a uniform mesh of `elements_count` elements of the given
    /// polynomial order, integrating with a Gauss rule of
    /// `quadrature_order` points.
    pub fn new(
        section: [T; 2],
        elements_count: usize,
        element_order: usize,
        quadrature_order: usize,
    ) -> Result<Self> {
        if section[1] <= section[0] {
            return Err(Error::ConfigInvalid("section must have positive length".to_string()));
        }
        if elements_count == 0 {
            return Err(Error::ConfigInvalid("mesh requires at least one element".to_string()));
        }
        let kind = match element_order {
            1 => ElementKind1d::Linear,
            2 => ElementKind1d::Quadratic,
            order => {
                return Err(Error::ConfigInvalid(format!(
                    "unsupported element order {}",
                    order
                )))
            }
        };
        if quadrature_order == 0 {
            return Err(Error::ConfigInvalid("quadrature order must be positive".to_string()));
        }
        let element = ReferenceElement1d::from_quadrature(kind, &GaussRule::gauss(quadrature_order));
        let step = (section[1] - section[0]) / T::from_usize(elements_count).unwrap();
        let jacobian = step / T::from_f64(2.0).unwrap();
        Ok(Self {
            element,
            section,
            elements_count,
            step,
            jacobian,
            neighbor_ranges: None,
        })
    }

    pub fn element(&self) -> &ReferenceElement1d<T> {
        &self.element
    }

    pub fn section(&self) -> [T; 2] {
        self.section
    }

    pub fn elements_count(&self) -> usize {
        self.elements_count
    }

    /// Element polynomial order.
    pub fn order(&self) -> usize {
        self.element.nodes_count() - 1
    }

    pub fn nodes_count(&self) -> usize {
        self.elements_count * self.order() + 1
    }

    /// Element length.
    pub fn step(&self) -> T {
        self.step
    }

    /// Constant geometric Jacobian `h / 2`.
    pub fn jacobian(&self) -> T {
        self.jacobian
    }

    pub fn node_coord(&self, node: usize) -> T {
        self.section[0]
            + self.step * T::from_usize(node).unwrap() / T::from_usize(self.order()).unwrap()
    }

    /// Global coordinate of quadrature node `q` of element `e`.
    pub fn quad_coord(&self, e: usize, q: usize) -> T {
        self.section[0]
            + self.step * T::from_usize(e).unwrap()
            + (self.element.qpoint(q) + T::one()) * self.jacobian
    }

    pub fn has_neighbors(&self) -> bool {
        self.neighbor_ranges.is_some()
    }

    /// `[left, right)` neighbour element range of `e`.
    ///
    /// # Panics
    ///
    /// Panics if the neighbour search has not been run.
    pub fn neighbor_range(&self, e: usize) -> (usize, usize) {
        self.neighbor_ranges
            .as_ref()
            .expect("find_neighbours must be called before querying neighbours")[e]
    }

    /// Fills the neighbour ranges: `e2` neighbours `e` iff some pair of
    /// their quadrature nodes lies within distance `r`.
    pub fn find_neighbours(&mut self, r: T) {
        // Quadrature nodes of an element occupy a fixed sub-interval; on a
        // uniform mesh the closest pair distance between elements k apart is
        // k * h - span.
        let qnodes = self.element.qnodes_count();
        let (mut lo, mut hi) = (self.element.qpoint(0), self.element.qpoint(0));
        for q in 1..qnodes {
            lo = lo.min(self.element.qpoint(q));
            hi = hi.max(self.element.qpoint(q));
        }
        let span = (hi - lo) * self.jacobian;

        let within = |distance_in_elements: usize| -> bool {
            let gap = self.step * T::from_usize(distance_in_elements).unwrap() - span;
            gap <= r
        };

        let ranges = (0..self.elements_count)
            .map(|e| {
                let mut left = e;
                while left > 0 && within(e - left + 1) {
                    left -= 1;
                }
                let mut right = e + 1;
                while right < self.elements_count && within(right - e) {
                    right += 1;
                }
                (left, right)
            })
            .collect();
        self.neighbor_ranges = Some(ranges);
    }
}

impl<T: Real> Topology for Mesh1d<T> {
    fn nodes_count(&self) -> usize {
        self.nodes_count()
    }

    fn owned_range(&self) -> (usize, usize) {
        (0, self.nodes_count())
    }

    fn for_each_incident(&self, node: usize, f: &mut dyn FnMut(usize, usize)) {
        let order = self.order();
        if node % order == 0 {
            let e = node / order;
            if e > 0 {
                f(e - 1, order);
            }
            if e < self.elements_count {
                f(e, 0);
            }
        } else {
            f(node / order, node % order);
        }
    }

    fn element_nodes_count(&self, _e: usize) -> usize {
        self.element.nodes_count()
    }

    fn node_number(&self, e: usize, i: usize) -> usize {
        e * self.order() + i
    }

    fn for_each_neighbor(&self, e: usize, f: &mut dyn FnMut(usize)) {
        let (left, right) = self.neighbor_range(e);
        for e2 in left..right {
            f(e2);
        }
    }
}
