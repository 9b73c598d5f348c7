use matrixcompare::assert_scalar_eq;
use nlfem::element::{ElementKind1d, ElementKind2d};
use nlfem::io::{csv, su2, vtk};
use nlfem::mesh::procedural::create_unit_square_quad_mesh;

const UNIT_QUAD_SU2: &str = "\
NDIME= 2
NELEM= 1
9 0 1 2 3 0
NPOIN= 4
0.0 0.0 0
1.0 0.0 1
1.0 1.0 2
0.0 1.0 3
NMARK= 2
MARKER_TAG= Down
MARKER_ELEMS= 1
3 0 1
MARKER_TAG= Up
MARKER_ELEMS= 1
3 2 3
";

#[test]
fn parses_a_single_bilinear_quad() {
    let mesh = su2::read_su2::<f64>(UNIT_QUAD_SU2).unwrap();
    assert_eq!(mesh.nodes_count(), 4);
    assert_eq!(mesh.elements_count(), 1);
    assert_eq!(mesh.element_kind(0), ElementKind2d::Bilinear);
    assert_eq!(mesh.element(0).nodes, vec![0, 1, 2, 3]);
    assert_eq!(mesh.boundary_groups_count(), 2);
    assert_eq!(mesh.boundary_group(0).name, "Down");
    assert_eq!(mesh.boundary_group(1).name, "Up");
    assert_eq!(mesh.boundary_group(0).elements[0].kind, ElementKind1d::Linear);
    assert_scalar_eq!(mesh.node(2).x, 1.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(mesh.node(2).y, 1.0, comp = abs, tol = 1e-15);
}

#[test]
fn serendipity_nodes_are_interleaved_on_input() {
    // File order is corners first (10..13), then mid-sides (20..23).
    let text = "\
NDIME= 2
NELEM= 1
23 10 11 12 13 20 21 22 23 0
NPOIN= 24
0 0 0
0 0 1
0 0 2
0 0 3
0 0 4
0 0 5
0 0 6
0 0 7
0 0 8
0 0 9
0 0 10
0 0 11
0 0 12
0 0 13
0 0 14
0 0 15
0 0 16
0 0 17
0 0 18
0 0 19
0 0 20
0 0 21
0 0 22
0 0 23
NMARK= 0
";
    let mesh = su2::read_su2::<f64>(text).unwrap();
    assert_eq!(mesh.element_kind(0), ElementKind2d::QuadraticSerendipity);
    assert_eq!(mesh.element(0).nodes, vec![10, 20, 11, 21, 12, 22, 13, 23]);
}

#[test]
fn quadratic_segments_are_reordered_end_middle_end() {
    let text = "\
NDIME= 2
NELEM= 1
5 0 1 2 0
NPOIN= 5
0 0 0
1 0 1
0 1 2
0.5 0 3
2 0 4
NMARK= 1
MARKER_TAG= Down
MARKER_ELEMS= 1
21 0 1 3
";
    let mesh = su2::read_su2::<f64>(text).unwrap();
    let segment = &mesh.boundary_group(0).elements[0];
    assert_eq!(segment.kind, ElementKind1d::Quadratic);
    // File order end, end, middle becomes end, middle, end.
    assert_eq!(segment.nodes, vec![0, 3, 1]);
}

#[test]
fn malformed_meshes_are_rejected() {
    // Unknown element code.
    let unknown = "NDIME= 2\nNELEM= 1\n42 0 1 2 0\nNPOIN= 3\n";
    assert!(matches!(
        su2::read_su2::<f64>(unknown),
        Err(nlfem::Error::MeshFormat(_))
    ));

    // Truncated node section.
    let truncated = "NDIME= 2\nNELEM= 1\n5 0 1 2 0\nNPOIN= 3\n0 0 0\n";
    assert!(matches!(
        su2::read_su2::<f64>(truncated),
        Err(nlfem::Error::MeshFormat(_))
    ));

    // Element references a missing node.
    let out_of_bounds = "\
NDIME= 2
NELEM= 1
5 0 1 7 0
NPOIN= 3
0 0 0
1 0 1
0 1 2
NMARK= 0
";
    assert!(matches!(
        su2::read_su2::<f64>(out_of_bounds),
        Err(nlfem::Error::MeshFormat(_))
    ));
}

#[test]
fn vtk_output_matches_the_legacy_layout() {
    let mesh = su2::read_su2::<f64>(UNIT_QUAD_SU2).unwrap();
    let field = vec![1.0, 2.0, 3.0, 4.0];
    let text = vtk::write_vtk(&mesh, &[("Temperature", &field)]).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "# vtk DataFile Version 4.2");
    assert_eq!(lines[2], "ASCII");
    assert_eq!(lines[3], "DATASET UNSTRUCTURED_GRID");
    assert_eq!(lines[4], "POINTS 4 double");
    assert_eq!(lines[5], "0 0 0");
    assert!(lines.contains(&"CELLS 1 5"));
    assert!(lines.contains(&"4 0 1 2 3"));
    assert!(lines.contains(&"CELL_TYPES 1"));
    assert!(lines.contains(&"9"));
    assert!(lines.contains(&"POINT_DATA 4"));
    assert!(lines.contains(&"SCALARS Temperature double 1"));
    assert!(lines.contains(&"LOOKUP_TABLE default"));
    assert_eq!(lines.last(), Some(&"4"));
}

#[test]
fn csv_rows_follow_node_order() {
    let mesh = create_unit_square_quad_mesh::<f64>(1);
    let values = vec![0.0, 0.25, 0.5, 0.75];
    let path = std::env::temp_dir().join("nlfem_csv_row_test.csv");
    csv::save_as_csv(&path, &mesh, &values).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<&str> = contents.lines().collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], "0,0,0");
    assert_eq!(rows[3], "1,1,0.75");
    std::fs::remove_file(path).ok();
}
