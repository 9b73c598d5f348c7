use matrixcompare::assert_scalar_eq;
use nlfem::element::{ElementCatalog, ElementKind1d, ElementKind2d, ReferenceElement2d};
use nlfem::quadrature::GaussRule;
use proptest::prelude::*;

#[test]
fn partition_of_unity_in_quadrature_tables() {
    let catalog = ElementCatalog::<f64>::new();
    for &kind in &ElementKind2d::ALL {
        let el = catalog.element_2d(kind);
        for q in 0..el.qnodes_count() {
            let mut sum_n = 0.0;
            let mut sum_xi = 0.0;
            let mut sum_eta = 0.0;
            for i in 0..el.nodes_count() {
                sum_n += el.q_n(i, q);
                sum_xi += el.q_n_xi(i, q);
                sum_eta += el.q_n_eta(i, q);
            }
            assert_scalar_eq!(sum_n, 1.0, comp = abs, tol = 1e-12);
            assert_scalar_eq!(sum_xi, 0.0, comp = abs, tol = 1e-12);
            assert_scalar_eq!(sum_eta, 0.0, comp = abs, tol = 1e-12);
        }
    }
    for &kind in &ElementKind1d::ALL {
        let el = catalog.element_1d(kind);
        for q in 0..el.qnodes_count() {
            let sum_n: f64 = (0..el.nodes_count()).map(|i| el.q_n(i, q)).sum();
            let sum_xi: f64 = (0..el.nodes_count()).map(|i| el.q_n_xi(i, q)).sum();
            assert_scalar_eq!(sum_n, 1.0, comp = abs, tol = 1e-12);
            assert_scalar_eq!(sum_xi, 0.0, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn quadrature_weights_sum_to_reference_measure() {
    let catalog = ElementCatalog::<f64>::new();
    for &kind in &ElementKind2d::ALL {
        let el = catalog.element_2d(kind);
        let total: f64 = (0..el.qnodes_count()).map(|q| el.weight(q)).sum();
        let expected = if kind.is_simplex() { 0.5 } else { 4.0 };
        assert_scalar_eq!(total, expected, comp = abs, tol = 1e-13);
    }
    for &kind in &ElementKind1d::ALL {
        let el = catalog.element_1d(kind);
        let total: f64 = (0..el.qnodes_count()).map(|q| el.weight(q)).sum();
        assert_scalar_eq!(total, 2.0, comp = abs, tol = 1e-13);
    }
}

#[test]
fn shape_functions_are_interpolatory() {
    // N_i(x_j) = delta_ij at the element's own nodes.
    for &kind in &ElementKind2d::ALL {
        for j in 0..kind.nodes_count() {
            let (xi, eta) = kind.node::<f64>(j);
            for i in 0..kind.nodes_count() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(kind.n(i, xi, eta), expected, comp = abs, tol = 1e-12);
            }
        }
    }
    for &kind in &ElementKind1d::ALL {
        for j in 0..kind.nodes_count() {
            let xi = kind.node::<f64>(j);
            for i in 0..kind.nodes_count() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(kind.n(i, xi), expected, comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn rebuilding_tables_changes_quadrature_count() {
    let mut catalog = ElementCatalog::<f64>::new();
    catalog.set_2d(ElementKind2d::Bilinear, &GaussRule::gauss(4));
    assert_eq!(catalog.element_2d(ElementKind2d::Bilinear).qnodes_count(), 16);
    catalog.set_1d(ElementKind1d::Linear, &GaussRule::gauss(5));
    assert_eq!(catalog.element_1d(ElementKind1d::Linear).qnodes_count(), 5);
}

#[test]
fn cubic_serendipity_gradients_match_finite_differences() {
    let kind = ElementKind2d::CubicSerendipity;
    let h = 1e-6;
    let samples = [(-0.7, 0.3), (0.1, -0.4), (0.5, 0.5), (0.0, 0.0)];
    for &(xi, eta) in &samples {
        for i in 0..kind.nodes_count() {
            let dxi_fd = (kind.n(i, xi + h, eta) - kind.n(i, xi - h, eta)) / (2.0 * h);
            let deta_fd = (kind.n(i, xi, eta + h) - kind.n(i, xi, eta - h)) / (2.0 * h);
            assert_scalar_eq!(kind.n_xi(i, xi, eta), dxi_fd, comp = abs, tol = 1e-8);
            assert_scalar_eq!(kind.n_eta(i, xi, eta), deta_fd, comp = abs, tol = 1e-8);
        }
    }
}

#[test]
fn cubic_serendipity_extended_tables_match_finite_differences() {
    let kind = ElementKind2d::CubicSerendipity;
    let el = ReferenceElement2d::<f64>::from_quadrature(kind, &GaussRule::gauss(3));
    let ext = el.extended().expect("cubic serendipity must carry extended tables");

    // The tables evaluate at the remapped quadrature nodes; reconstruct the
    // node coordinates from the tensor layout of the incoming rule.
    let rule = GaussRule::<f64>::gauss(3);
    let h = 1e-5;
    for i in 0..kind.nodes_count() {
        for (a, &xi) in rule.points().iter().enumerate() {
            for (b, &eta) in rule.points().iter().enumerate() {
                let q = a * rule.len() + b;
                let idx = i * el.qnodes_count() + q;

                let dxi2_fd = (kind.n_xi(i, xi + h, eta) - kind.n_xi(i, xi - h, eta)) / (2.0 * h);
                let dxieta_fd = (kind.n_xi(i, xi, eta + h) - kind.n_xi(i, xi, eta - h)) / (2.0 * h);
                let deta2_fd = (kind.n_eta(i, xi, eta + h) - kind.n_eta(i, xi, eta - h)) / (2.0 * h);
                assert_scalar_eq!(ext.n_xi2[idx], dxi2_fd, comp = abs, tol = 1e-7);
                assert_scalar_eq!(ext.n_xieta[idx], dxieta_fd, comp = abs, tol = 1e-7);
                assert_scalar_eq!(ext.n_eta2[idx], deta2_fd, comp = abs, tol = 1e-7);
            }
        }
    }
}

#[test]
fn only_cubic_serendipity_carries_extended_tables() {
    let catalog = ElementCatalog::<f64>::new();
    for &kind in &ElementKind2d::ALL {
        let has_extended = catalog.element_2d(kind).extended().is_some();
        assert_eq!(has_extended, kind == ElementKind2d::CubicSerendipity);
    }
}

proptest! {
    #[test]
    fn partition_of_unity_pointwise(xi in -1.0..1.0f64, eta in -1.0..1.0f64) {
        for &kind in &ElementKind2d::ALL {
            // Map the square sample into the triangle for simplex kinds.
            let (x, y) = if kind.is_simplex() {
                let u = (xi + 1.0) / 2.0;
                let v = (eta + 1.0) / 2.0 * (1.0 - u);
                (u, v)
            } else {
                (xi, eta)
            };
            let sum: f64 = (0..kind.nodes_count()).map(|i| kind.n(i, x, y)).sum();
            prop_assert!((sum - 1.0).abs() < 1e-12);

            let sum_xi: f64 = (0..kind.nodes_count()).map(|i| kind.n_xi(i, x, y)).sum();
            let sum_eta: f64 = (0..kind.nodes_count()).map(|i| kind.n_eta(i, x, y)).sum();
            prop_assert!(sum_xi.abs() < 1e-11);
            prop_assert!(sum_eta.abs() < 1e-11);
        }
    }
}
