use super::{dense_heat_matrix, proxy_of, two_by_two_mesh};
use matrixcompare::assert_scalar_eq;
use nalgebra::SMatrix;
use nlfem::assembly::{is_nonlocal, CsrPairAssembler};
use nlfem::heat;
use nlfem::influence::Polynomial;
use nlfem::mesh::procedural::create_unit_square_quad_mesh;
use nlfem::mesh::proxy::Balancing;
use nlfem::solve::dense_from_upper;

#[test]
fn local_weight_threshold() {
    assert!(!is_nonlocal(1.0));
    assert!(!is_nonlocal(0.9995));
    assert!(is_nonlocal(0.9989));
    assert!(is_nonlocal(0.5));
}

#[test]
fn rows_are_sorted_and_duplicate_free() {
    let proxy = proxy_of(create_unit_square_quad_mesh(3));
    let n = proxy.mesh().nodes_count();
    let assembler = CsrPairAssembler::<_, 1>::new(&proxy, vec![true; n], false).unwrap();
    let matrices = assembler
        .assemble(
            false,
            |e, i, j| SMatrix::<f64, 1, 1>::new(heat::integrate_loc(&proxy, e, i, j)),
            |_, _, _, _| SMatrix::<f64, 1, 1>::zeros(),
            |e, i| heat::integrate_basic(&proxy, e, i),
        )
        .unwrap();

    for matrix in [&matrices.inner, &matrices.bound] {
        for row in matrix.row_iter() {
            let cols = row.col_indices();
            assert!(cols.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
fn two_pass_assembly_matches_direct_dense_assembly() {
    let proxy = proxy_of(create_unit_square_quad_mesh(3));
    let n = proxy.mesh().nodes_count();
    let assembler = CsrPairAssembler::<_, 1>::new(&proxy, vec![true; n], false).unwrap();
    let matrices = assembler
        .assemble(
            false,
            |e, i, j| SMatrix::<f64, 1, 1>::new(heat::integrate_loc(&proxy, e, i, j)),
            |_, _, _, _| SMatrix::<f64, 1, 1>::zeros(),
            |e, i| heat::integrate_basic(&proxy, e, i),
        )
        .unwrap();

    let reference = dense_heat_matrix(&proxy, 1.0, 1.0, false, |_, _| 0.0);
    let reconstructed = dense_from_upper(&matrices.inner);
    assert_eq!(reconstructed.nrows(), n);
    for i in 0..n {
        for j in 0..n {
            assert_scalar_eq!(reconstructed[(i, j)], reference[(i, j)], comp = abs, tol = 1e-13);
        }
    }
    assert_eq!(matrices.bound.nnz(), 0);
}

#[test]
fn nonlocal_two_pass_assembly_matches_direct_dense_assembly() {
    let mut proxy = proxy_of(create_unit_square_quad_mesh(3));
    let r = 0.4;
    proxy.find_neighbours(r, Balancing::Memory);
    let bell = Polynomial::new(r, 2, 1);
    let p1 = 0.5;

    let n = proxy.mesh().nodes_count();
    let assembler = CsrPairAssembler::<_, 1>::new(&proxy, vec![true; n], false).unwrap();
    let matrices = assembler
        .assemble(
            true,
            |e, i, j| SMatrix::<f64, 1, 1>::new(p1 * heat::integrate_loc(&proxy, e, i, j)),
            |e_l, e_nl, i_l, j_nl| {
                SMatrix::<f64, 1, 1>::new(
                    (1.0 - p1)
                        * heat::integrate_nonloc(&proxy, &|x, y| bell.evaluate(x, y), e_l, e_nl, i_l, j_nl),
                )
            },
            |e, i| heat::integrate_basic(&proxy, e, i),
        )
        .unwrap();

    let reference = dense_heat_matrix(&proxy, 1.0, p1, true, |x, y| bell.evaluate(x, y));
    let reconstructed = dense_from_upper(&matrices.inner);
    for i in 0..n {
        for j in 0..n {
            assert_scalar_eq!(reconstructed[(i, j)], reference[(i, j)], comp = abs, tol = 1e-13);
        }
    }

    // Symmetry of the underlying bilinear form: the direct assembly fills
    // both triangles independently.
    for i in 0..n {
        for j in (i + 1)..n {
            assert_scalar_eq!(reference[(i, j)], reference[(j, i)], comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn dirichlet_rows_are_identity_and_couplings_move_to_bound() {
    let proxy = proxy_of(two_by_two_mesh());
    let mesh = proxy.mesh();
    let n = mesh.nodes_count();

    // Dirichlet on every boundary node; only the centre node (4) stays
    // interior.
    let mut mask = vec![false; n];
    mask[4] = true;
    let assembler = CsrPairAssembler::<_, 1>::new(&proxy, mask.clone(), false).unwrap();
    let matrices = assembler
        .assemble(
            false,
            |e, i, j| SMatrix::<f64, 1, 1>::new(heat::integrate_loc(&proxy, e, i, j)),
            |_, _, _, _| SMatrix::<f64, 1, 1>::zeros(),
            |e, i| heat::integrate_basic(&proxy, e, i),
        )
        .unwrap();

    let reference = dense_heat_matrix(&proxy, 1.0, 1.0, false, |_, _| 0.0);

    for (row, csr_row) in matrices.inner.row_iter().enumerate() {
        if mask[row] {
            continue;
        }
        assert_eq!(csr_row.col_indices(), &[row]);
        assert_eq!(csr_row.values(), &[1.0]);
    }

    // The interior row couples to Dirichlet columns only through K_bound.
    let bound_row = matrices.bound.row(4);
    for (&col, &value) in bound_row.col_indices().iter().zip(bound_row.values()) {
        assert!(!mask[col]);
        assert_scalar_eq!(value, reference[(4, col)], comp = abs, tol = 1e-13);
    }
    let inner_row = matrices.inner.row(4);
    assert_eq!(inner_row.col_indices(), &[4]);
    assert_scalar_eq!(inner_row.values()[0], reference[(4, 4)], comp = abs, tol = 1e-13);
}

#[test]
fn neumann_augmentation_adds_mean_column() {
    let proxy = proxy_of(two_by_two_mesh());
    let n = proxy.mesh().nodes_count();
    let assembler = CsrPairAssembler::<_, 1>::new(&proxy, vec![true; n], true).unwrap();
    let matrices = assembler
        .assemble(
            false,
            |e, i, j| SMatrix::<f64, 1, 1>::new(heat::integrate_loc(&proxy, e, i, j)),
            |_, _, _, _| SMatrix::<f64, 1, 1>::zeros(),
            |e, i| heat::integrate_basic(&proxy, e, i),
        )
        .unwrap();

    assert_eq!(matrices.inner.nrows(), n + 1);
    assert_eq!(matrices.inner.ncols(), n + 1);

    // Every node row carries the augmentation column, whose entries are the
    // shape-function integrals; they must sum to the mesh area.
    let mut total = 0.0;
    for (row, csr_row) in matrices.inner.row_iter().enumerate().take(n) {
        let last = csr_row.col_indices().last().copied().unwrap();
        assert_eq!(last, n, "row {} misses the augmentation column", row);
        total += csr_row.values().last().copied().unwrap();
    }
    assert_scalar_eq!(total, 4.0, comp = abs, tol = 1e-12);

    // The augmentation row itself is empty in upper-triangular storage.
    assert_eq!(matrices.inner.row(n).nnz(), 0);
}

#[test]
fn mask_length_is_validated() {
    let proxy = proxy_of(two_by_two_mesh());
    let result = CsrPairAssembler::<_, 1>::new(&proxy, vec![true; 3], false);
    assert!(matches!(result, Err(nlfem::Error::ShapeMismatch { .. })));
}
