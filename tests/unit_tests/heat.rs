use super::{proxy_of, two_by_two_mesh};
use matrixcompare::assert_scalar_eq;
use nalgebra::Point2;
use nlfem::bc::BoundaryCondition;
use nlfem::heat::{HeatParameters, HeatSolver, TimeStepping};
use nlfem::influence::Polynomial;
use nlfem::mesh::proxy::Balancing;

fn dirichlet_all(
    value: impl Fn(&Point2<f64>) -> f64 + Clone + Send + Sync + 'static,
) -> Vec<BoundaryCondition<f64, 1>> {
    (0..4)
        .map(|_| BoundaryCondition::temperature(value.clone()))
        .collect()
}

fn no_influence(_: &Point2<f64>, _: &Point2<f64>) -> f64 {
    0.0
}

#[test]
fn dirichlet_quadratic_solution_is_nodally_exact() {
    // Unit-square-like patch on [0, 2]^2: u = x^2 + y^2, f = -4, p1 = 1.
    let proxy = proxy_of(two_by_two_mesh());
    let solver = HeatSolver::new(&proxy);
    let solution = solver
        .stationary(
            &HeatParameters::default(),
            &dirichlet_all(|p: &Point2<f64>| p.x * p.x + p.y * p.y),
            |_| -4.0,
            no_influence,
        )
        .unwrap();

    for (i, node) in proxy.mesh().nodes().iter().enumerate() {
        let expected = node.x * node.x + node.y * node.y;
        assert_scalar_eq!(solution.temperature()[i], expected, comp = abs, tol = 1e-10);
    }
}

#[test]
fn linear_patch_test_on_distorted_mesh() {
    // Move the centre node off the grid; a linear field must still be
    // reproduced exactly.
    let template = two_by_two_mesh();
    let mut nodes = template.nodes().to_vec();
    nodes[4] = Point2::new(1.17, 0.86);
    let mesh = nlfem::mesh::Mesh2d::from_parts(
        nodes,
        template.elements().to_vec(),
        template.boundary_groups().to_vec(),
    );
    let proxy = proxy_of(mesh);
    let solver = HeatSolver::new(&proxy);
    let exact = |p: &Point2<f64>| 2.0 + 3.0 * p.x - 0.5 * p.y;
    let solution = solver
        .stationary(&HeatParameters::default(), &dirichlet_all(exact), |_| 0.0, no_influence)
        .unwrap();

    for (i, node) in proxy.mesh().nodes().iter().enumerate() {
        assert_scalar_eq!(solution.temperature()[i], exact(node), comp = abs, tol = 1e-10);
    }
}

#[test]
fn pure_neumann_solution_is_linear_with_zero_mean() {
    // Fluxes: Down -1, Up +1, Left/Right 0; f = 0; expected u = y - 1
    // (mean-zero over [0, 2]^2).
    let proxy = proxy_of(two_by_two_mesh());
    let conditions = vec![
        BoundaryCondition::flux(|_: &Point2<f64>| -1.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 0.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 1.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 0.0),
    ];
    let solver = HeatSolver::new(&proxy);
    let solution = solver
        .stationary(&HeatParameters::default(), &conditions, |_| 0.0, no_influence)
        .unwrap();

    for (i, node) in proxy.mesh().nodes().iter().enumerate() {
        assert_scalar_eq!(solution.temperature()[i], node.y - 1.0, comp = abs, tol = 1e-10);
    }
    assert_scalar_eq!(solution.energy(), 0.0, comp = abs, tol = 1e-10);
}

#[test]
fn pure_neumann_with_net_flux_is_rejected() {
    let proxy = proxy_of(two_by_two_mesh());
    let conditions = vec![
        BoundaryCondition::flux(|_: &Point2<f64>| -1.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 0.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 2.0),
        BoundaryCondition::flux(|_: &Point2<f64>| 0.0),
    ];
    let solver = HeatSolver::new(&proxy);
    let result = solver.stationary(&HeatParameters::default(), &conditions, |_| 0.0, no_influence);
    assert!(matches!(result, Err(nlfem::Error::UnsolvableNeumann { .. })));
}

#[test]
fn mixed_nonlocal_model_stays_symmetric_and_solvable() {
    let mut proxy = proxy_of(two_by_two_mesh());
    let r = 1.2;
    proxy.find_neighbours(r, Balancing::Memory);
    let bell = Polynomial::new(r, 2, 1);

    let parameters = HeatParameters {
        local_weight: 0.6,
        nonlocal_radius: r,
        ..HeatParameters::default()
    };
    let solver = HeatSolver::new(&proxy);
    let solution = solver
        .stationary(
            &parameters,
            &dirichlet_all(|p: &Point2<f64>| p.x),
            |_| 0.0,
            |x, y| bell.evaluate(x, y),
        )
        .unwrap();
    // A sanity range: the solution stays near the boundary-data bounds.
    for &value in solution.temperature().iter() {
        assert!((-0.5..=2.5).contains(&value));
    }
}

#[test]
fn nonlocal_weight_without_neighbor_search_is_rejected() {
    let proxy = proxy_of(two_by_two_mesh());
    let parameters = HeatParameters {
        local_weight: 0.5,
        nonlocal_radius: 0.7,
        ..HeatParameters::default()
    };
    let solver = HeatSolver::new(&proxy);
    let result = solver.stationary(
        &parameters,
        &dirichlet_all(|_: &Point2<f64>| 0.0),
        |_| 0.0,
        no_influence,
    );
    assert!(matches!(result, Err(nlfem::Error::ConfigInvalid(_))));
}

#[test]
fn out_of_range_local_weight_is_rejected() {
    let proxy = proxy_of(two_by_two_mesh());
    let parameters = HeatParameters {
        local_weight: 1.5,
        ..HeatParameters::default()
    };
    let solver = HeatSolver::new(&proxy);
    let result = solver.stationary(
        &parameters,
        &dirichlet_all(|_: &Point2<f64>| 0.0),
        |_| 0.0,
        no_influence,
    );
    assert!(matches!(result, Err(nlfem::Error::ConfigInvalid(_))));
}

#[test]
fn detached_solver_reports_missing_proxy() {
    let solver = HeatSolver::<f64>::detached();
    let result = solver.stationary(
        &HeatParameters::default(),
        &[],
        |_| 0.0,
        no_influence,
    );
    assert!(matches!(result, Err(nlfem::Error::NullProxy)));
}

#[test]
fn implicit_euler_preserves_stationary_states() {
    // u = x is harmonic and satisfies the boundary data at all times, so
    // every implicit-Euler step must reproduce it.
    let proxy = proxy_of(two_by_two_mesh());
    let solver = HeatSolver::new(&proxy);
    let stepping = TimeStepping {
        interval: [0.0, 1.0],
        steps: 4,
        save_frequency: 1,
    };
    let mut observed_steps = Vec::new();
    let solution = solver
        .nonstationary(
            &stepping,
            &HeatParameters::default(),
            &dirichlet_all(|p: &Point2<f64>| p.x),
            |p| p.x,
            |_| 0.0,
            no_influence,
            |step, field| {
                observed_steps.push(step);
                for (i, node) in proxy_nodes().iter().enumerate() {
                    assert_scalar_eq!(field[i], node.x, comp = abs, tol = 1e-9);
                }
            },
        )
        .unwrap();

    assert_eq!(observed_steps, vec![0, 1, 2, 3, 4]);
    for (i, node) in proxy.mesh().nodes().iter().enumerate() {
        assert_scalar_eq!(solution.temperature()[i], node.x, comp = abs, tol = 1e-9);
    }
}

fn proxy_nodes() -> Vec<Point2<f64>> {
    two_by_two_mesh().nodes().to_vec()
}
