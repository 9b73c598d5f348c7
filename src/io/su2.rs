//! Reader for SU2-like text meshes.
//!
//! Expected section order: NDIME, NELEM (+ interior elements), NPOIN
//! (+ nodes), NMARK (+ one MARKER_TAG / MARKER_ELEMS block per boundary
//! group). Node orderings are normalised on input to counter-clockwise with
//! mid-side nodes interleaved.

use crate::element::{ElementKind1d, ElementKind2d};
use crate::mesh::{BoundaryGroup, Element1d, Element2d, Mesh2d};
use crate::{Error, Real, Result};
use nalgebra::Point2;
use std::path::Path;
use std::str::SplitWhitespace;

/// VTK model codes accepted in mesh files.
pub mod vtk_codes {
    pub const LINEAR: usize = 3;
    pub const TRIANGLE: usize = 5;
    pub const BILINEAR: usize = 9;
    pub const QUADRATIC: usize = 21;
    pub const QUADRATIC_TRIANGLE: usize = 22;
    pub const QUADRATIC_SERENDIPITY: usize = 23;
    pub const QUADRATIC_LAGRANGE: usize = 28;
}

struct Tokens<'a> {
    iter: SplitWhitespace<'a>,
    section: &'static str,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            iter: text.split_whitespace(),
            section: "header",
        }
    }

    fn enter(&mut self, section: &'static str) {
        self.section = section;
    }

    fn next(&mut self) -> Result<&'a str> {
        self.iter
            .next()
            .ok_or_else(|| Error::MeshFormat(format!("unexpected end of file in section {}", self.section)))
    }

    fn keyword(&mut self, expected: &str) -> Result<()> {
        let token = self.next()?;
        if token != expected {
            return Err(Error::MeshFormat(format!(
                "expected {} in section {}, found {}",
                expected, self.section, token
            )));
        }
        Ok(())
    }

    fn usize(&mut self) -> Result<usize> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|_| Error::MeshFormat(format!("invalid integer {} in section {}", token, self.section)))
    }

    fn scalar<T: Real>(&mut self) -> Result<T> {
        let token = self.next()?;
        let value: f64 = token
            .parse()
            .map_err(|_| Error::MeshFormat(format!("invalid number {} in section {}", token, self.section)))?;
        Ok(T::from_f64(value).unwrap())
    }
}

/// Reads node indices in file order and scatters them into the interleaved
/// internal ordering given by `slots`.
fn read_reordered(tokens: &mut Tokens, slots: &[usize]) -> Result<Vec<usize>> {
    let mut nodes = vec![0usize; slots.len()];
    for &slot in slots {
        nodes[slot] = tokens.usize()?;
    }
    Ok(nodes)
}

fn read_element_2d(tokens: &mut Tokens) -> Result<Element2d> {
    let code = tokens.usize()?;
    let (kind, slots): (_, &[usize]) = match code {
        vtk_codes::TRIANGLE => (ElementKind2d::Triangle, &[0, 1, 2]),
        vtk_codes::QUADRATIC_TRIANGLE => (ElementKind2d::QuadraticTriangle, &[0, 1, 2, 3, 4, 5]),
        vtk_codes::BILINEAR => (ElementKind2d::Bilinear, &[0, 1, 2, 3]),
        vtk_codes::QUADRATIC_SERENDIPITY => {
            (ElementKind2d::QuadraticSerendipity, &[0, 2, 4, 6, 1, 3, 5, 7])
        }
        vtk_codes::QUADRATIC_LAGRANGE => {
            (ElementKind2d::QuadraticLagrange, &[0, 2, 4, 6, 1, 3, 5, 7, 8])
        }
        _ => return Err(Error::MeshFormat(format!("unknown 2D element code {}", code))),
    };
    let nodes = read_reordered(tokens, slots)?;
    // Trailing element index column.
    tokens.next()?;
    Ok(Element2d { kind, nodes })
}

fn read_element_1d(tokens: &mut Tokens) -> Result<Element1d> {
    let code = tokens.usize()?;
    let (kind, slots): (_, &[usize]) = match code {
        vtk_codes::LINEAR => (ElementKind1d::Linear, &[0, 1]),
        vtk_codes::QUADRATIC => (ElementKind1d::Quadratic, &[0, 2, 1]),
        _ => return Err(Error::MeshFormat(format!("unknown 1D element code {}", code))),
    };
    read_reordered(tokens, slots).map(|nodes| Element1d { kind, nodes })
}

/// Parses a mesh from SU2 text.
pub fn read_su2<T: Real>(text: &str) -> Result<Mesh2d<T>> {
    let mut tokens = Tokens::new(text);

    tokens.keyword("NDIME=")?;
    let dimension = tokens.usize()?;
    if dimension != 2 {
        return Err(Error::MeshFormat(format!("unsupported dimension {}", dimension)));
    }

    tokens.enter("NELEM");
    tokens.keyword("NELEM=")?;
    let elements_count = tokens.usize()?;
    let mut elements = Vec::with_capacity(elements_count);
    for _ in 0..elements_count {
        elements.push(read_element_2d(&mut tokens)?);
    }

    tokens.enter("NPOIN");
    tokens.keyword("NPOIN=")?;
    let nodes_count = tokens.usize()?;
    let mut nodes = Vec::with_capacity(nodes_count);
    for _ in 0..nodes_count {
        let x = tokens.scalar::<T>()?;
        let y = tokens.scalar::<T>()?;
        // Trailing node index column.
        tokens.next()?;
        nodes.push(Point2::new(x, y));
    }

    tokens.enter("NMARK");
    tokens.keyword("NMARK=")?;
    let groups_count = tokens.usize()?;
    let mut boundary_groups = Vec::with_capacity(groups_count);
    for _ in 0..groups_count {
        tokens.keyword("MARKER_TAG=")?;
        let name = tokens.next()?.to_string();
        tokens.keyword("MARKER_ELEMS=")?;
        let group_elements_count = tokens.usize()?;
        let mut group_elements = Vec::with_capacity(group_elements_count);
        for _ in 0..group_elements_count {
            group_elements.push(read_element_1d(&mut tokens)?);
        }
        boundary_groups.push(BoundaryGroup {
            name,
            elements: group_elements,
        });
    }

    // Index consistency across the whole connectivity.
    let in_bounds = |nodes_list: &[usize]| nodes_list.iter().all(|&n| n < nodes_count);
    if !elements.iter().all(|e| in_bounds(&e.nodes))
        || !boundary_groups
            .iter()
            .all(|g| g.elements.iter().all(|e| in_bounds(&e.nodes)))
    {
        return Err(Error::MeshFormat("element references a node out of bounds".to_string()));
    }

    Ok(Mesh2d::from_parts(nodes, elements, boundary_groups))
}

/// Loads a mesh from an SU2 file.
pub fn load_su2<T: Real>(path: impl AsRef<Path>) -> Result<Mesh2d<T>> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|err| Error::MeshFormat(format!("cannot read {}: {}", path.as_ref().display(), err)))?;
    read_su2(&text)
}
