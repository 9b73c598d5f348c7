use matrixcompare::assert_scalar_eq;
use nlfem::bc::BoundaryKind;
use nlfem::heat::{HeatParameters, TimeStepping};
use nlfem::heat1d::HeatSolver1d;
use nlfem::influence::Polynomial1d;
use nlfem::mesh1d::Mesh1d;
use nlfem::solve::dense_from_upper;

fn no_influence(_: f64, _: f64) -> f64 {
    0.0
}

#[test]
fn dirichlet_ramp_is_nodally_exact() {
    // Segment [0, 1], 10 linear elements, u(0) = 0, u(1) = 1, f = 0.
    let mesh = Mesh1d::new([0.0, 1.0], 10, 1, 1).unwrap();
    let solver = HeatSolver1d::new(&mesh);
    let temperature = solver
        .stationary(
            &HeatParameters::default(),
            [(BoundaryKind::FirstKind, 0.0), (BoundaryKind::FirstKind, 1.0)],
            |_| 0.0,
            no_influence,
        )
        .unwrap();

    for node in 0..mesh.nodes_count() {
        let expected = node as f64 * 0.1;
        assert_scalar_eq!(temperature[node], expected, comp = abs, tol = 1e-12);
    }
}

#[test]
fn quadratic_elements_reproduce_quadratic_solutions() {
    // -u'' = -2 with u(0) = 0, u(1) = 1 has the solution u = x^2, inside
    // the quadratic element space.
    let mesh = Mesh1d::new([0.0, 1.0], 5, 2, 2).unwrap();
    let solver = HeatSolver1d::new(&mesh);
    let temperature = solver
        .stationary(
            &HeatParameters::default(),
            [(BoundaryKind::FirstKind, 0.0), (BoundaryKind::FirstKind, 1.0)],
            |_| -2.0,
            no_influence,
        )
        .unwrap();
    for node in 0..mesh.nodes_count() {
        let x = mesh.node_coord(node);
        assert_scalar_eq!(temperature[node], x * x, comp = abs, tol = 1e-11);
    }
}

#[test]
fn mixed_nonlocal_problem_converges_and_is_symmetric() {
    // p1 = 0.5, influence (1 - ((x - y)/r)^2)^2 with r = 0.1, u(0) = 0,
    // u'(1) = 1.
    let r = 0.1;
    let mut mesh = Mesh1d::new([0.0, 1.0], 10, 1, 3).unwrap();
    mesh.find_neighbours(r);
    let influence = move |x: f64, y: f64| {
        let s = (x - y) / r;
        (1.0 - s * s).max(0.0).powi(2)
    };

    let parameters = HeatParameters {
        local_weight: 0.5,
        nonlocal_radius: r,
        ..HeatParameters::default()
    };
    let solver = HeatSolver1d::new(&mesh);
    let temperature = solver
        .stationary(
            &parameters,
            [(BoundaryKind::FirstKind, 0.0), (BoundaryKind::SecondKind, 1.0)],
            |_| 0.0,
            influence,
        )
        .unwrap();

    // Heat flows in from the right end: the solution must increase
    // monotonically from the clamped left end.
    assert_scalar_eq!(temperature[0], 0.0, comp = abs, tol = 1e-14);
    for node in 1..mesh.nodes_count() {
        assert!(temperature[node] > temperature[node - 1] - 1e-12);
    }
    assert!(temperature[mesh.nodes_count() - 1] > 0.5);

    // The mixed operator is symmetric to machine precision.
    let mixed = assemble_dense(&mesh, 0.5, influence, true);
    assert!((&mixed - mixed.transpose()).norm() < 1e-12);
}

#[test]
fn nonlocal_stiffness_approaches_local_as_radius_shrinks() {
    // With a normalised influence function the nonlocal operator converges
    // to the local one as the horizon shrinks; track the Frobenius distance
    // over decreasing radii.
    let elements = 40;
    let distance_for = |r: f64| -> f64 {
        let mut mesh = Mesh1d::new([0.0, 1.0], elements, 1, 3).unwrap();
        mesh.find_neighbours(r);
        let bell = Polynomial1d::new(r, 2, 2);
        let local = assemble_dense(&mesh, 1.0, |_, _| 0.0, false);
        let nonlocal = assemble_dense(&mesh, 0.0, |x, y| bell.evaluate(x, y), true);
        (local - nonlocal).norm()
    };

    let coarse = distance_for(0.2);
    let medium = distance_for(0.1);
    let fine = distance_for(0.05);
    assert!(medium < coarse, "distance must shrink with the radius");
    assert!(fine < medium, "distance must keep shrinking");
}

/// Dense assembly of `p1 * L + (1 - p1) * N` on a 1D mesh via the public
/// solver path: recovered from the upper CSR of the stationary system with
/// all-interior rows.
fn assemble_dense(
    mesh: &Mesh1d<f64>,
    local_weight: f64,
    influence: impl Fn(f64, f64) -> f64 + Sync,
    nonlocal: bool,
) -> nalgebra::DMatrix<f64> {
    use nalgebra::SMatrix;
    use nlfem::assembly::CsrPairAssembler;

    let n = mesh.nodes_count();
    let el = mesh.element();
    let jacobian = mesh.jacobian();

    let integrate_loc = |e: usize, i: usize, j: usize| -> f64 {
        let _ = e;
        let mut integral = 0.0;
        for q in 0..el.qnodes_count() {
            integral += el.weight(q) * el.q_n_xi(i, q) * el.q_n_xi(j, q);
        }
        integral / jacobian
    };
    let integrate_nonloc = |e_l: usize, e_nl: usize, i_l: usize, j_nl: usize| -> f64 {
        let mut integral = 0.0;
        for q_l in 0..el.qnodes_count() {
            let x = mesh.quad_coord(e_l, q_l);
            let mut inner = 0.0;
            for q_nl in 0..el.qnodes_count() {
                let y = mesh.quad_coord(e_nl, q_nl);
                inner += el.weight(q_nl) * influence(x, y) * el.q_n_xi(j_nl, q_nl);
            }
            integral += el.weight(q_l) * el.q_n_xi(i_l, q_l) * inner;
        }
        integral
    };

    let assembler = CsrPairAssembler::<_, 1>::new(mesh, vec![true; n], false).unwrap();
    let matrices = assembler
        .assemble(
            nonlocal,
            |e, i, j| SMatrix::<f64, 1, 1>::new(local_weight * integrate_loc(e, i, j)),
            |e_l, e_nl, i_l, j_nl| {
                SMatrix::<f64, 1, 1>::new((1.0 - local_weight) * integrate_nonloc(e_l, e_nl, i_l, j_nl))
            },
            |_, _| 0.0,
        )
        .unwrap();
    dense_from_upper(&matrices.inner)
}

#[test]
fn one_dimensional_neumann_compatibility() {
    let mesh = Mesh1d::new([0.0, 1.0], 10, 1, 1).unwrap();
    let solver = HeatSolver1d::new(&mesh);

    // Balanced fluxes pin the mean and give the linear profile u = x + c.
    let temperature = solver
        .stationary(
            &HeatParameters::default(),
            [(BoundaryKind::SecondKind, -1.0), (BoundaryKind::SecondKind, 1.0)],
            |_| 0.0,
            no_influence,
        )
        .unwrap();
    for node in 1..mesh.nodes_count() {
        let expected = temperature[0] + mesh.node_coord(node);
        assert_scalar_eq!(temperature[node], expected, comp = abs, tol = 1e-10);
    }

    // Unbalanced fluxes are rejected before assembly.
    let result = solver.stationary(
        &HeatParameters::default(),
        [(BoundaryKind::SecondKind, -1.0), (BoundaryKind::SecondKind, 2.0)],
        |_| 0.0,
        no_influence,
    );
    assert!(matches!(result, Err(nlfem::Error::UnsolvableNeumann { .. })));
}

#[test]
fn implicit_euler_relaxes_to_the_stationary_ramp() {
    let mesh = Mesh1d::new([0.0, 1.0], 10, 1, 1).unwrap();
    let solver = HeatSolver1d::new(&mesh);
    let stepping = TimeStepping {
        interval: [0.0, 10.0],
        steps: 400,
        save_frequency: 100,
    };
    let left = |_t: f64| 0.0;
    let right = |_t: f64| 1.0;
    let mut saves = 0usize;
    let temperature = solver
        .nonstationary(
            &stepping,
            &HeatParameters::default(),
            [
                (BoundaryKind::FirstKind, &left as &dyn Fn(f64) -> f64),
                (BoundaryKind::FirstKind, &right as &dyn Fn(f64) -> f64),
            ],
            |_| 0.0,
            |_| 0.0,
            no_influence,
            |_, _| saves += 1,
        )
        .unwrap();

    assert_eq!(saves, 5);
    for node in 0..mesh.nodes_count() {
        assert_scalar_eq!(temperature[node], mesh.node_coord(node), comp = abs, tol = 1e-6);
    }
}

#[test]
fn invalid_mesh_configuration_is_rejected() {
    assert!(matches!(
        Mesh1d::<f64>::new([0.0, 1.0], 10, 3, 1),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
    assert!(matches!(
        Mesh1d::<f64>::new([1.0, 0.0], 10, 1, 1),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
    assert!(matches!(
        Mesh1d::<f64>::new([0.0, 1.0], 0, 1, 1),
        Err(nlfem::Error::ConfigInvalid(_))
    ));
}
