use gemlab::mesh::{Mesh, Point};
use qnsim::prelude::*;
use qnsim::{FnTime, StrError};
use russell_lab::approx_eq;

// Hardening spring f(e) = k·e + k3·e³ between a support (0) and a loaded point (1)
//
//   0 ──/\/\/\── 1 → P(t) = 10·t
fn mesh() -> Mesh {
    Mesh {
        ndim: 2,
        points: vec![
            Point {
                id: 0,
                marker: 0,
                coords: vec![0.0, 0.0],
            },
            Point {
                id: 1,
                marker: 0,
                coords: vec![1.0, 0.0],
            },
        ],
        cells: Vec::new(),
    }
}

fn run(method: QnMethod) -> Result<(f64, f64, Counters), StrError> {
    let mesh = mesh();
    let ramp: FnTime = |t| t;
    let mut model = FemModel::new(&mesh);
    model.add_domain(NonlinearSprings::new(2, &[(0, 1)], &[1.0, 0.0], 100.0, 1e4)?);
    model
        .essential
        .prescribed(&[0], Dof::Ux, 0.0, None)
        .fixed(&[0, 1], &[Dof::Uy]);
    model.natural.points(&[1], Dof::Ux, 10.0, Some(ramp));

    let mut config = Config::new();
    config.qn_method = method;
    config.tol_residual = 1e-6;
    config.control.dt = |_| 0.1;
    let mut solver = SolverQuasin::new(model, &config)?;
    let mut state = FemState::new(&solver.equations, &config)?;
    solver.solve(&mut state)?;

    let e = state.value(&solver.equations, 1, Dof::Ux)?;
    let reaction = solver.reaction(0, Dof::Ux)?;
    Ok((e, reaction, solver.counters))
}

#[test]
fn test_springs_bfgs() -> Result<(), StrError> {
    let (e, reaction, counters) = run(QnMethod::Bfgs)?;
    approx_eq(100.0 * e + 1e4 * e * e * e, 10.0, 1e-4);
    approx_eq(reaction, -10.0, 1e-4);
    assert_eq!(counters.n_time_steps, 10);
    assert!(counters.n_updates > 0);
    Ok(())
}

#[test]
fn test_springs_broyden() -> Result<(), StrError> {
    let (e, reaction, counters) = run(QnMethod::Broyden)?;
    approx_eq(100.0 * e + 1e4 * e * e * e, 10.0, 1e-4);
    approx_eq(reaction, -10.0, 1e-4);
    assert_eq!(counters.n_time_steps, 10);
    assert!(counters.n_updates > 0);
    Ok(())
}

#[test]
fn test_springs_full_newton() -> Result<(), StrError> {
    let (e, reaction, counters) = run(QnMethod::FullNewton)?;
    approx_eq(100.0 * e + 1e4 * e * e * e, 10.0, 1e-4);
    approx_eq(reaction, -10.0, 1e-4);
    assert_eq!(counters.n_time_steps, 10);
    assert_eq!(counters.n_updates, 0);
    assert_eq!(counters.n_reformations, counters.n_iterations);
    Ok(())
}
