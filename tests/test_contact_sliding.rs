use qnsim::prelude::*;
use qnsim::StrError;
use russell_lab::approx_eq;

// Two unit cubes stacked along z and touching at z = 1 (no gap)
//
//   12..15  top of the upper cube: Uz = −0.01
//    8..11  bottom of the upper cube (slave)
//    4..7   top of the lower cube (master)
//    0..3   bottom of the lower cube: Uz = 0
//
// With ν = 0 both cubes act as springs of stiffness E·A/L = 1000 in series;
// the penalty ε·A = 1e5 adds a third (stiff) spring
#[test]
fn test_contact_sliding_compression() -> Result<(), StrError> {
    let (mesh, top, bottom) = SampleMeshes::two_cubes(0.0);
    let mut model = FemModel::new(&mesh);
    model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.0)?);
    let master = model.add_surface(ContactSurface::new(&mesh, &[top])?);
    let slave = model.add_surface(ContactSurface::new(&mesh, &[bottom])?);
    let mut params = ContactParams::new();
    params.epsn = 1e5;
    model.add_contact(ContactInterface::new(ContactKind::Sliding, slave, master, params)?)?;

    let lower = [0, 1, 2, 3];
    let upper = [12, 13, 14, 15];
    model
        .essential
        .prescribed(&lower, Dof::Uz, 0.0, None)
        .prescribed(&upper, Dof::Uz, -0.01, None)
        .fixed(&lower, &[Dof::Ux, Dof::Uy])
        .fixed(&upper, &[Dof::Ux, Dof::Uy]);

    let mut config = Config::new();
    config.qn_method = QnMethod::FullNewton;
    config.ls_tol = 0.0;
    config.control.dt = |_| 1.0;
    let mut solver = SolverQuasin::new(model, &config)?;
    let mut state = FemState::new(&solver.equations, &config)?;
    solver.solve(&mut state)?;
    assert_eq!(solver.counters.n_time_steps, 1);
    assert!(solver.counters.n_augmentations > 1);

    // the compression force is transmitted through the interface
    let mut sum_upper = 0.0;
    let mut sum_lower = 0.0;
    for i in 0..4 {
        sum_upper += solver.reaction(upper[i], Dof::Uz)?;
        sum_lower += solver.reaction(lower[i], Dof::Uz)?;
    }
    approx_eq(sum_upper, -5.0, 1e-3);
    approx_eq(sum_lower, 5.0, 1e-3);

    // all slave points are in contact with a negligible penetration
    let surface = solver.model.surfaces.get(slave);
    assert_eq!(surface.points.len(), 4);
    for point in &surface.points {
        assert!(point.active);
        assert!(point.gap < 0.0);
        assert!(f64::abs(point.gap) < 1e-6);
        approx_eq(point.normal[2], 1.0, 1e-12);
    }
    Ok(())
}

// The upper cube is lifted; the surfaces separate and no force is transmitted
#[test]
fn test_contact_sliding_separation() -> Result<(), StrError> {
    let (mesh, top, bottom) = SampleMeshes::two_cubes(0.0);
    let mut model = FemModel::new(&mesh);
    model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.0)?);
    let master = model.add_surface(ContactSurface::new(&mesh, &[top])?);
    let slave = model.add_surface(ContactSurface::new(&mesh, &[bottom])?);
    let mut params = ContactParams::new();
    params.epsn = 1e5;
    model.add_contact(ContactInterface::new(ContactKind::Sliding, slave, master, params)?)?;

    let lower = [0, 1, 2, 3];
    let upper = [12, 13, 14, 15];
    model
        .essential
        .prescribed(&lower, Dof::Uz, 0.0, None)
        .prescribed(&upper, Dof::Uz, 0.01, None)
        .fixed(&lower, &[Dof::Ux, Dof::Uy])
        .fixed(&upper, &[Dof::Ux, Dof::Uy]);

    let mut config = Config::new();
    config.qn_method = QnMethod::FullNewton;
    config.control.dt = |_| 1.0;
    let mut solver = SolverQuasin::new(model, &config)?;
    let mut state = FemState::new(&solver.equations, &config)?;
    solver.solve(&mut state)?;

    for i in 0..4 {
        approx_eq(solver.reaction(upper[i], Dof::Uz)?, 0.0, 1e-10);
        approx_eq(state.value(&solver.equations, 8 + i, Dof::Uz)?, 0.01, 1e-10);
    }
    for point in &solver.model.surfaces.get(slave).points {
        assert!(!point.active);
    }
    Ok(())
}

// The corner (1, 1, 1) of both contact faces is raised to z = 1.02, thus the master
// facet is warped and the normal varies along it; the stiffness keeps the normal of the
// last update fixed, and the iterations must still converge
#[test]
fn test_contact_sliding_curved_master() -> Result<(), StrError> {
    let (mut mesh, top, bottom) = SampleMeshes::two_cubes(0.0);
    mesh.points[6].coords[2] = 1.02;
    mesh.points[10].coords[2] = 1.02;
    let mut model = FemModel::new(&mesh);
    model.add_domain(ElasticSolid::new(&mesh, 1, 1000.0, 0.0)?);
    let master = model.add_surface(ContactSurface::new(&mesh, &[top])?);
    let slave = model.add_surface(ContactSurface::new(&mesh, &[bottom])?);
    let mut params = ContactParams::new();
    params.epsn = 1e5;
    model.add_contact(ContactInterface::new(ContactKind::Sliding, slave, master, params)?)?;

    let lower = [0, 1, 2, 3];
    let upper = [12, 13, 14, 15];
    model
        .essential
        .prescribed(&lower, Dof::Uz, 0.0, None)
        .prescribed(&upper, Dof::Uz, -0.01, None)
        .fixed(&lower, &[Dof::Ux, Dof::Uy])
        .fixed(&upper, &[Dof::Ux, Dof::Uy]);

    let mut config = Config::new();
    config.qn_method = QnMethod::FullNewton;
    config.control.dt = |_| 1.0;
    let mut solver = SolverQuasin::new(model, &config)?;
    let mut state = FemState::new(&solver.equations, &config)?;
    solver.solve(&mut state)?;
    assert_eq!(solver.counters.n_time_steps, 1);
    assert_eq!(solver.counters.n_retries, 0);

    // compression is transmitted and the reactions balance (up to the residual tolerance)
    let mut sum_upper = 0.0;
    let mut sum_lower = 0.0;
    for i in 0..4 {
        sum_upper += solver.reaction(upper[i], Dof::Uz)?;
        sum_lower += solver.reaction(lower[i], Dof::Uz)?;
    }
    assert!(sum_upper < -1.0);
    assert!(f64::abs(sum_upper + sum_lower) < 1e-2 * f64::abs(sum_upper));

    // the normal at the raised corner is tilted
    let surface = solver.model.surfaces.get(slave);
    for point in &surface.points {
        assert!(point.active);
        assert!(point.gap < 0.0);
        assert!(f64::abs(point.gap) < 1e-5);
    }
    let tilted = surface.points.iter().any(|p| p.normal[2] < 1.0 - 1e-6);
    assert!(tilted);
    Ok(())
}
