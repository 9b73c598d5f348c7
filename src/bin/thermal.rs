//! Stationary heat conduction driver.
//!
//! Loads an SU2 mesh, solves the mixed local-nonlocal stationary heat
//! problem with the polynomial bell influence function and the canonical
//! flux boundary set, then writes `heat.vtk` plus raw CSV fields.

use clap::Parser;
use eyre::WrapErr;
use nlfem::assembly;
use nlfem::bc::BoundaryCondition;
use nlfem::element::ElementCatalog;
use nlfem::heat::{HeatParameters, HeatSolver};
use nlfem::influence::Polynomial;
use nlfem::io::su2;
use nlfem::mesh::proxy::{Balancing, MeshProxy};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "thermal", about = "Stationary heat conduction with a local-nonlocal conductivity model")]
struct Args {
    /// Path to the SU2 mesh.
    mesh: PathBuf,
    /// Number of worker threads.
    num_threads: usize,
    /// Nonlocal interaction radius.
    radius: f64,
    /// Local weight p1 in [0, 1].
    local_weight: f64,
}

fn main() -> eyre::Result<()> {
    env_logger::init();
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .build_global()
        .wrap_err("cannot configure the thread pool")?;

    nlfem::config::validate_model(args.radius, args.local_weight)?;

    let mesh = su2::load_su2::<f64>(&args.mesh)?;
    let mut proxy = MeshProxy::new(mesh, ElementCatalog::new())?;
    if assembly::is_nonlocal(args.local_weight) {
        proxy.find_neighbours(args.radius, Balancing::Memory);
    }

    let bell = Polynomial::new(args.radius.max(f64::EPSILON), 2, 1);
    let parameters = HeatParameters {
        local_weight: args.local_weight,
        nonlocal_radius: args.radius,
        ..HeatParameters::default()
    };

    // Flux-driven benchmark: unit inflow below, unit outflow above.
    let conditions: Vec<BoundaryCondition<f64, 1>> = proxy
        .mesh()
        .boundary_groups()
        .iter()
        .map(|group| match group.name.as_str() {
            "Down" => BoundaryCondition::flux(|_| -1.0),
            "Up" => BoundaryCondition::flux(|_| 1.0),
            _ => BoundaryCondition::flux(|_| 0.0),
        })
        .collect();

    let solver = HeatSolver::new(&proxy);
    let solution = solver
        .stationary(&parameters, &conditions, |_| 0.0, |x, y| bell.evaluate(x, y))
        .wrap_err("stationary solve failed")?;

    println!("Energy = {}", solution.energy());
    solution.save_raw_csv(".").wrap_err("cannot write CSV output")?;
    solution.save_as_vtk("heat.vtk").wrap_err("cannot write heat.vtk")?;
    Ok(())
}
