//! Index-based container for 2D meshes with named boundary groups.

use crate::element::{ElementKind1d, ElementKind2d};
use nalgebra::{Point2, Scalar};
use serde::{Deserialize, Serialize};

pub mod procedural;
pub mod proxy;

/// An interior (2D) element: a kind tag plus its global node indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element2d {
    pub kind: ElementKind2d,
    pub nodes: Vec<usize>,
}

/// A boundary (1D) element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element1d {
    pub kind: ElementKind1d,
    pub nodes: Vec<usize>,
}

/// A named, contiguous group of boundary elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryGroup {
    pub name: String,
    pub elements: Vec<Element1d>,
}

/// Nodes, interior connectivity and boundary groups of a conforming 2D mesh.
///
/// The container is immutable after load. Node orderings follow the catalog
/// convention (counter-clockwise, mid-side nodes interleaved); the SU2
/// reader normalises file orderings on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Mesh2d<T: Scalar> {
    nodes: Vec<Point2<T>>,
    elements: Vec<Element2d>,
    boundary_groups: Vec<BoundaryGroup>,
}

impl<T: Scalar> Mesh2d<T> {
    /// Constructs a mesh from its parts.
    ///
    /// Node indices referenced by the connectivity must be in bounds; users
    /// of the mesh are permitted to panic when they encounter indices out of
    /// bounds, so the connectivity must always be checked by the producer.
    pub fn from_parts(
        nodes: Vec<Point2<T>>,
        elements: Vec<Element2d>,
        boundary_groups: Vec<BoundaryGroup>,
    ) -> Self {
        Self {
            nodes,
            elements,
            boundary_groups,
        }
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, i: usize) -> &Point2<T> {
        &self.nodes[i]
    }

    pub fn nodes(&self) -> &[Point2<T>] {
        &self.nodes
    }

    pub fn elements_count(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, e: usize) -> &Element2d {
        &self.elements[e]
    }

    pub fn elements(&self) -> &[Element2d] {
        &self.elements
    }

    pub fn element_kind(&self, e: usize) -> ElementKind2d {
        self.elements[e].kind
    }

    /// Number of nodes of element `e`.
    pub fn nodes_count_of(&self, e: usize) -> usize {
        self.elements[e].nodes.len()
    }

    /// Global index of the i-th node of element `e`.
    pub fn node_number(&self, e: usize, i: usize) -> usize {
        self.elements[e].nodes[i]
    }

    pub fn boundary_groups_count(&self) -> usize {
        self.boundary_groups.len()
    }

    pub fn boundary_group(&self, b: usize) -> &BoundaryGroup {
        &self.boundary_groups[b]
    }

    pub fn boundary_groups(&self) -> &[BoundaryGroup] {
        &self.boundary_groups
    }

    pub fn boundary_group_by_name(&self, name: &str) -> Option<&BoundaryGroup> {
        self.boundary_groups.iter().find(|group| group.name == name)
    }

    /// Global index of the i-th node of boundary element `e` in group `b`.
    pub fn boundary_node_number(&self, b: usize, e: usize, i: usize) -> usize {
        self.boundary_groups[b].elements[e].nodes[i]
    }
}
