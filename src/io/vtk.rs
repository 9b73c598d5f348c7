//! Legacy VTK (ASCII, DataFile version 4.2) writer for unstructured grids.

use crate::element::ElementKind2d;
use crate::io::su2::vtk_codes;
use crate::mesh::Mesh2d;
use crate::Real;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;

fn vtk_scalar_name<T>() -> &'static str {
    if std::mem::size_of::<T>() == 4 {
        "float"
    } else {
        "double"
    }
}

fn scalar<T: Real>(value: T) -> f64 {
    nalgebra::try_convert(value).unwrap_or(f64::NAN)
}

/// File-order node permutation of each kind (the inverse of the reordering
/// applied on input: corners first, then mid-side nodes).
fn cell_order(kind: ElementKind2d) -> Option<(usize, &'static [usize])> {
    match kind {
        ElementKind2d::Triangle => Some((vtk_codes::TRIANGLE, &[0, 1, 2])),
        ElementKind2d::QuadraticTriangle => Some((vtk_codes::QUADRATIC_TRIANGLE, &[0, 1, 2, 3, 4, 5])),
        ElementKind2d::Bilinear => Some((vtk_codes::BILINEAR, &[0, 1, 2, 3])),
        ElementKind2d::QuadraticSerendipity => {
            Some((vtk_codes::QUADRATIC_SERENDIPITY, &[0, 2, 4, 6, 1, 3, 5, 7]))
        }
        ElementKind2d::QuadraticLagrange => {
            Some((vtk_codes::QUADRATIC_LAGRANGE, &[0, 2, 4, 6, 1, 3, 5, 7, 8]))
        }
        // No legacy VTK model for the cubic serendipity quad.
        ElementKind2d::CubicSerendipity => None,
    }
}

/// Renders the mesh and the given per-node scalar fields as a legacy VTK
/// unstructured grid.
pub fn write_vtk<T: Real>(mesh: &Mesh2d<T>, fields: &[(&str, &[T])]) -> std::io::Result<String> {
    let mut out = String::new();

    out.push_str("# vtk DataFile Version 4.2\n");
    out.push_str("Data\n");
    out.push_str("ASCII\n");
    out.push_str("DATASET UNSTRUCTURED_GRID\n");

    writeln!(&mut out, "POINTS {} {}", mesh.nodes_count(), vtk_scalar_name::<T>()).unwrap();
    for node in mesh.nodes() {
        writeln!(&mut out, "{} {} 0", scalar(node.x), scalar(node.y)).unwrap();
    }

    let list_size: usize = mesh.elements().iter().map(|e| e.nodes.len() + 1).sum();
    writeln!(&mut out, "CELLS {} {}", mesh.elements_count(), list_size).unwrap();
    for element in mesh.elements() {
        let (_, order) = cell_order(element.kind).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "element kind has no legacy VTK model",
            )
        })?;
        write!(&mut out, "{}", element.nodes.len()).unwrap();
        for &slot in order {
            write!(&mut out, " {}", element.nodes[slot]).unwrap();
        }
        out.push('\n');
    }

    writeln!(&mut out, "CELL_TYPES {}", mesh.elements_count()).unwrap();
    for element in mesh.elements() {
        let (code, _) = cell_order(element.kind).expect("checked above");
        writeln!(&mut out, "{}", code).unwrap();
    }

    if !fields.is_empty() {
        writeln!(&mut out, "POINT_DATA {}", mesh.nodes_count()).unwrap();
        for (name, values) in fields {
            assert_eq!(values.len(), mesh.nodes_count(), "field length must match node count");
            writeln!(&mut out, "SCALARS {} {} 1", name, vtk_scalar_name::<T>()).unwrap();
            out.push_str("LOOKUP_TABLE default\n");
            for &value in *values {
                writeln!(&mut out, "{}", scalar(value)).unwrap();
            }
        }
    }

    Ok(out)
}

/// Writes the mesh and fields to a legacy VTK file.
pub fn save_as_vtk<T: Real>(
    path: impl AsRef<Path>,
    mesh: &Mesh2d<T>,
    fields: &[(&str, &[T])],
) -> std::io::Result<()> {
    let contents = write_vtk(mesh, fields)?;
    File::create(path)?.write_all(contents.as_bytes())
}
