//! Raw CSV output: one `x,y,value` row per node.

use crate::mesh::Mesh2d;
use crate::Real;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::Write as IoWrite;
use std::path::Path;

fn scalar<T: Real>(value: T) -> f64 {
    nalgebra::try_convert(value).unwrap_or(f64::NAN)
}

/// Writes one field in node order.
pub fn save_as_csv<T: Real>(
    path: impl AsRef<Path>,
    mesh: &Mesh2d<T>,
    values: &[T],
) -> std::io::Result<()> {
    assert_eq!(values.len(), mesh.nodes_count(), "field length must match node count");
    let mut out = String::new();
    for (node, &value) in mesh.nodes().iter().zip(values) {
        writeln!(&mut out, "{},{},{}", scalar(node.x), scalar(node.y), scalar(value)).unwrap();
    }
    File::create(path)?.write_all(out.as_bytes())
}
