//! Procedural mesh constructors, mainly for tests and examples.

use crate::element::{ElementKind1d, ElementKind2d};
use crate::mesh::{BoundaryGroup, Element1d, Element2d, Mesh2d};
use crate::Real;
use itertools::iproduct;
use nalgebra::Point2;

/// Creates a uniform mesh of bilinear quads on the rectangle
/// `[x0, x1] x [y0, y1]` with `nx` by `ny` cells.
///
/// Boundary groups are named `Down`, `Right`, `Up`, `Left` and consist of
/// linear segments ordered counter-clockwise along each side.
pub fn create_rectangle_quad_mesh<T>(nx: usize, ny: usize, x: [T; 2], y: [T; 2]) -> Mesh2d<T>
where
    T: Real,
{
    assert!(nx > 0 && ny > 0, "mesh must have at least one cell per axis");
    let hx = (x[1] - x[0]) / T::from_usize(nx).unwrap();
    let hy = (y[1] - y[0]) / T::from_usize(ny).unwrap();

    let node_index = |i: usize, j: usize| j * (nx + 1) + i;

    let nodes = iproduct!(0..=ny, 0..=nx)
        .map(|(j, i)| {
            let px = x[0] + hx * T::from_usize(i).unwrap();
            let py = y[0] + hy * T::from_usize(j).unwrap();
            Point2::new(px, py)
        })
        .collect();

    let elements = iproduct!(0..ny, 0..nx)
        .map(|(j, i)| Element2d {
            kind: ElementKind2d::Bilinear,
            nodes: vec![
                node_index(i, j),
                node_index(i + 1, j),
                node_index(i + 1, j + 1),
                node_index(i, j + 1),
            ],
        })
        .collect();

    let segment = |n0: usize, n1: usize| Element1d {
        kind: ElementKind1d::Linear,
        nodes: vec![n0, n1],
    };

    let down = (0..nx)
        .map(|i| segment(node_index(i, 0), node_index(i + 1, 0)))
        .collect();
    let right = (0..ny)
        .map(|j| segment(node_index(nx, j), node_index(nx, j + 1)))
        .collect();
    let up = (0..nx)
        .map(|i| segment(node_index(nx - i, ny), node_index(nx - i - 1, ny)))
        .collect();
    let left = (0..ny)
        .map(|j| segment(node_index(0, ny - j), node_index(0, ny - j - 1)))
        .collect();

    let boundary_groups = vec![
        BoundaryGroup {
            name: "Down".to_string(),
            elements: down,
        },
        BoundaryGroup {
            name: "Right".to_string(),
            elements: right,
        },
        BoundaryGroup {
            name: "Up".to_string(),
            elements: up,
        },
        BoundaryGroup {
            name: "Left".to_string(),
            elements: left,
        },
    ];

    Mesh2d::from_parts(nodes, elements, boundary_groups)
}

/// Creates a uniform `n x n` bilinear-quad mesh of the unit square.
pub fn create_unit_square_quad_mesh<T>(n: usize) -> Mesh2d<T>
where
    T: Real,
{
    create_rectangle_quad_mesh(n, n, [T::zero(), T::one()], [T::zero(), T::one()])
}
