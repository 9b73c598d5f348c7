use super::{proxy_of, two_by_two_mesh};
use matrixcompare::assert_scalar_eq;
use nlfem::element::ElementCatalog;
use nlfem::mesh::procedural::create_unit_square_quad_mesh;
use nlfem::mesh::proxy::{Balancing, MeshProxy, Partition};

#[test]
fn quadrature_tables_on_uniform_quads() {
    let proxy = proxy_of(create_unit_square_quad_mesh(2));
    let mesh = proxy.mesh();
    for e in 0..mesh.elements_count() {
        let jacobi = proxy.jacobi_matrices(e);
        // Axis-aligned squares of side 1/2: J = diag(1/4, 1/4).
        for j in jacobi {
            assert_scalar_eq!(j[(0, 0)], 0.25, comp = abs, tol = 1e-14);
            assert_scalar_eq!(j[(1, 1)], 0.25, comp = abs, tol = 1e-14);
            assert_scalar_eq!(j[(0, 1)], 0.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(j[(1, 0)], 0.0, comp = abs, tol = 1e-14);
            assert_scalar_eq!(MeshProxy::jacobian(j), 0.0625, comp = abs, tol = 1e-14);
        }
        // Quadrature nodes stay inside the element.
        for p in proxy.quad_coords(e) {
            assert!(p.x > 0.0 && p.x < 1.0 && p.y > 0.0 && p.y < 1.0);
        }
    }
}

#[test]
fn node_elements_and_local_numbering_are_consistent() {
    let proxy = proxy_of(two_by_two_mesh());
    let mesh = proxy.mesh();
    for node in 0..mesh.nodes_count() {
        for &e in proxy.node_elements(node) {
            let local = proxy.global_to_local(e, node);
            assert_eq!(mesh.node_number(e, local), node);
        }
    }
    // The centre node of a 2x2 grid touches all four elements.
    assert_eq!(proxy.node_elements(4).len(), 4);
}

#[test]
fn integrate_solution_of_unity_is_the_area() {
    let proxy = proxy_of(two_by_two_mesh());
    let ones = vec![1.0; proxy.mesh().nodes_count()];
    assert_scalar_eq!(proxy.integrate_solution(&ones), 4.0, comp = abs, tol = 1e-12);
}

#[test]
fn gradient_of_linear_field_is_exact() {
    let proxy = proxy_of(two_by_two_mesh());
    let mesh = proxy.mesh();
    let u: Vec<f64> = (0..mesh.nodes_count())
        .map(|i| {
            let p = mesh.node(i);
            3.0 * p.x - 2.0 * p.y + 1.0
        })
        .collect();
    let [du_dx, du_dy] = proxy.gradient(&u);
    for node in 0..mesh.nodes_count() {
        assert_scalar_eq!(du_dx[node], 3.0, comp = abs, tol = 1e-12);
        assert_scalar_eq!(du_dy[node], -2.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn boundary_tables_cover_the_groups() {
    let proxy = proxy_of(two_by_two_mesh());
    let mesh = proxy.mesh();
    for b in 0..mesh.boundary_groups_count() {
        for e in 0..mesh.boundary_group(b).elements.len() {
            let el = proxy.element_1d(b, e);
            assert_eq!(proxy.boundary_quad_coords(b, e).len(), el.qnodes_count());
            // Straight segments of length 1: ||J|| = 1/2 everywhere.
            for j in proxy.boundary_jacobi(b, e) {
                assert_scalar_eq!(MeshProxy::jacobian_1d(j), 0.5, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn partition_splits_nodes_contiguously() {
    let partition = |rank| Partition { rank, size: 3 };
    let ranges: Vec<_> = (0..3).map(|rank| partition(rank).node_range(10)).collect();
    assert_eq!(ranges, vec![(0, 4), (4, 7), (7, 10)]);

    let proxy = MeshProxy::with_partition(
        two_by_two_mesh(),
        ElementCatalog::new(),
        Partition { rank: 1, size: 3 },
    )
    .unwrap();
    assert_eq!((proxy.first_node(), proxy.last_node()), (3, 6));
}

/// Brute-force evaluation of the neighbour criterion straight from the
/// definition, as an independent reference.
fn reference_neighbors(proxy: &MeshProxy<f64>, r: f64) -> Vec<Vec<usize>> {
    let elements = proxy.mesh().elements_count();
    (0..elements)
        .map(|e| {
            (0..elements)
                .filter(|&e2| {
                    proxy.quad_coords(e).iter().any(|p| {
                        proxy
                            .quad_coords(e2)
                            .iter()
                            .any(|p2| (*p2 - *p).norm() <= r)
                    })
                })
                .collect()
        })
        .collect()
}

#[test]
fn neighbor_lists_match_the_pair_criterion() {
    // 3x3 bilinear grid with r = 1.5 h.
    let h = 1.0 / 3.0;
    let r = 1.5 * h;
    let mut proxy = proxy_of(create_unit_square_quad_mesh(3));
    proxy.find_neighbours(r, Balancing::Memory);

    let expected = reference_neighbors(&proxy, r);
    for e in 0..proxy.mesh().elements_count() {
        assert_eq!(proxy.neighbors(e), expected[e].as_slice(), "element {}", e);
    }

    // Sorted, duplicate-free, undirected, and self-inclusive.
    for e in 0..proxy.mesh().elements_count() {
        let neighbors = proxy.neighbors(e);
        assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
        assert!(neighbors.contains(&e));
        for &e2 in neighbors {
            assert!(proxy.neighbors(e2).contains(&e));
        }
    }

    // Every edge- and vertex-adjacent element is within 1.5 h.
    let center = 4; // middle element of the 3x3 grid
    for adjacent in [0, 1, 2, 3, 5, 6, 7, 8] {
        assert!(proxy.neighbors(center).contains(&adjacent));
    }
}

#[test]
fn balancing_modes_agree() {
    let mut memory = proxy_of(create_unit_square_quad_mesh(3));
    let mut speed = proxy_of(create_unit_square_quad_mesh(3));
    memory.find_neighbours(0.4, Balancing::Memory);
    speed.find_neighbours(0.4, Balancing::Speed);
    for e in 0..memory.mesh().elements_count() {
        assert_eq!(memory.neighbors(e), speed.neighbors(e));
    }
}
