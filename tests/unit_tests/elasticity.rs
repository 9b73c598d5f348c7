use super::{proxy_of, two_by_two_mesh};
use matrixcompare::assert_scalar_eq;
use nalgebra::{Point2, Vector2};
use nlfem::bc::{BoundaryComponent, BoundaryCondition};
use nlfem::elasticity::{ElasticityParameters, StaticSolver};

fn no_influence(_: &Point2<f64>, _: &Point2<f64>) -> f64 {
    0.0
}

fn parameters() -> ElasticityParameters<f64> {
    ElasticityParameters {
        young: 210.0,
        poisson: 0.3,
        local_weight: 1.0,
        nonlocal_radius: 0.0,
    }
}

fn clamped_linear_displacement(a: f64, b: f64) -> Vec<BoundaryCondition<f64, 2>> {
    (0..4)
        .map(|_| {
            BoundaryCondition::from_components([
                BoundaryComponent::first_kind(move |p: &Point2<f64>| a * p.x),
                BoundaryComponent::first_kind(move |p: &Point2<f64>| b * p.y),
            ])
        })
        .collect()
}

#[test]
fn linear_displacement_patch_test() {
    // u_x = a x, u_y = b y prescribed on the whole boundary with zero body
    // force: the interior must reproduce the linear field exactly.
    let (a, b) = (1e-3, -4e-4);
    let proxy = proxy_of(two_by_two_mesh());
    let solver = StaticSolver::new(&proxy);
    let solution = solver
        .stationary(
            &parameters(),
            &clamped_linear_displacement(a, b),
            |_| Vector2::zeros(),
            no_influence,
        )
        .unwrap();

    for (i, node) in proxy.mesh().nodes().iter().enumerate() {
        assert_scalar_eq!(solution.displacement()[2 * i], a * node.x, comp = abs, tol = 1e-12);
        assert_scalar_eq!(solution.displacement()[2 * i + 1], b * node.y, comp = abs, tol = 1e-12);
    }
}

#[test]
fn constant_strain_state_is_recovered() {
    let (a, b) = (2e-3, 1e-3);
    let proxy = proxy_of(two_by_two_mesh());
    let solver = StaticSolver::new(&proxy);
    let params = parameters();
    let solution = solver
        .stationary(
            &params,
            &clamped_linear_displacement(a, b),
            |_| Vector2::zeros(),
            no_influence,
        )
        .unwrap();

    let field = solution.strains_and_stresses(no_influence);
    let d = params.hooke();
    for node in 0..proxy.mesh().nodes_count() {
        assert_scalar_eq!(field.strain[0][node], a, comp = abs, tol = 1e-10);
        assert_scalar_eq!(field.strain[1][node], b, comp = abs, tol = 1e-10);
        assert_scalar_eq!(field.strain[2][node], 0.0, comp = abs, tol = 1e-10);
        assert_scalar_eq!(field.stress[0][node], d[0] * a + d[1] * b, comp = abs, tol = 1e-8);
        assert_scalar_eq!(field.stress[1][node], d[1] * a + d[0] * b, comp = abs, tol = 1e-8);
        assert_scalar_eq!(field.stress[2][node], 0.0, comp = abs, tol = 1e-8);
    }
}

#[test]
fn invalid_poisson_ratio_is_rejected() {
    let proxy = proxy_of(two_by_two_mesh());
    let solver = StaticSolver::new(&proxy);
    let bad = ElasticityParameters {
        poisson: 0.5,
        ..parameters()
    };
    let result = solver.stationary(
        &bad,
        &clamped_linear_displacement(0.0, 0.0),
        |_| Vector2::zeros(),
        no_influence,
    );
    assert!(matches!(result, Err(nlfem::Error::ConfigInvalid(_))));
}

#[test]
fn unbalanced_traction_is_rejected() {
    // Pure traction with a net horizontal force violates the compatibility
    // condition and must be rejected before assembly.
    let proxy = proxy_of(two_by_two_mesh());
    let solver = StaticSolver::new(&proxy);
    let conditions: Vec<BoundaryCondition<f64, 2>> = (0..4)
        .map(|b| {
            let traction = if b == 1 { 1.0 } else { 0.0 };
            BoundaryCondition::from_components([
                BoundaryComponent::second_kind(move |_: &Point2<f64>| traction),
                BoundaryComponent::second_kind(|_: &Point2<f64>| 0.0),
            ])
        })
        .collect();
    let result = solver.stationary(&parameters(), &conditions, |_| Vector2::zeros(), no_influence);
    assert!(matches!(result, Err(nlfem::Error::UnsolvableNeumann { .. })));
}
