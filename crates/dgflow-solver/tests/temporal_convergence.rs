//! Temporal convergence of the fluid and scalar integrators.
//!
//! The manufactured solutions are constant in space on a periodic mesh, so
//! the spatial error vanishes and the observed error is that of the time
//! integrator alone. The channel flow adds Dirichlet velocity data and a
//! linear pressure, which the P1 space also represents exactly.
//! Histories are seeded from the analytical solution.

use std::sync::Arc;

use dgflow_model::{
    FluidParameters, FluidScheme, ProjectionParameters, ScalarParameters, ScalarScheme,
    SolverSettings, VelocityCoupling,
};
use dgflow_solver::{
    DgNavierStokesOperators, DgScalarOperators, DgSpace, FluidFunctions, FluidIntegrator,
    FluidSolver, Mesh, ScalarFunctions, ScalarIntegrator, ScalarSolver,
};

fn periodic_space() -> Arc<DgSpace> {
    Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 4, true).unwrap()))
}

fn tight_solver() -> SolverSettings {
    SolverSettings {
        max_iter: 2000,
        abs_tol: 1e-14,
        rel_tol: 1e-12,
        max_krylov_size: 200,
    }
}

fn fluid_error(scheme: FluidScheme, order: usize, dt: f64) -> f64 {
    let space = periodic_space();
    let penalties = scheme != FluidScheme::Coupled;
    let params = FluidParameters {
        scheme,
        order_time_integrator: order,
        start_with_low_order: false,
        time_step_size: dt,
        order_pressure_extrapolation: 1.min(order),
        solver_viscous: tight_solver(),
        solver_pressure_poisson: tight_solver(),
        solver_coupled: tight_solver(),
        projection: ProjectionParameters {
            use_divergence_penalty: penalties,
            use_continuity_penalty: penalties,
            solver_data: tight_solver(),
            ..Default::default()
        },
        ..Default::default()
    };
    let functions = FluidFunctions {
        initial_velocity: Arc::new(|_, t| (2.0 * t).cos()),
        analytical_velocity: Arc::new(|_, t| (2.0 * t).cos()),
        body_force: Arc::new(|_, t| -2.0 * (2.0 * t).sin()),
        ..Default::default()
    };
    let operators = DgNavierStokesOperators::new(space.clone(), &params, &functions);
    let mut solver = FluidSolver::new(&params, 0, &operators, &functions).unwrap();
    solver.setup(false).unwrap();
    let dt = solver.calculate_time_step_size().unwrap();
    solver.set_time_step_size(dt);
    while !solver.advance_one_timestep(true).unwrap() {}

    assert!((solver.time() - 1.0).abs() < 1e-12);
    assert!(space.l2_norm(solver.pressure()) < 1e-8);
    space.l2_error(solver.velocity(), |_| 2.0f64.cos())
}

fn scalar_error(scheme: ScalarScheme, order: usize, dt: f64) -> f64 {
    let space = periodic_space();
    let params = ScalarParameters {
        scheme,
        order_time_integrator: order,
        start_with_low_order: false,
        time_step_size: dt,
        solver: tight_solver(),
        ..Default::default()
    };
    let functions = ScalarFunctions {
        initial_solution: Arc::new(|_, t| (3.0 * t).sin()),
        analytical_solution: Arc::new(|_, t| (3.0 * t).sin()),
        source: Arc::new(|_, t| 3.0 * (3.0 * t).cos()),
        transport_velocity: Arc::new(|_, _| 1.0),
        ..Default::default()
    };
    let operators = DgScalarOperators::new(space.clone(), &params, &functions);
    let mut solver =
        ScalarSolver::new(&params, 0, VelocityCoupling::Prescribed, &operators, &functions)
            .unwrap();
    solver.setup(false).unwrap();
    let dt = solver.calculate_time_step_size().unwrap();
    solver.set_time_step_size(dt);
    while !solver.advance_one_timestep(true).unwrap() {}

    assert!((solver.time() - 1.0).abs() < 1e-12);
    space.l2_error(solver.solution(), |_| 3.0f64.sin())
}

fn assert_rate(coarse: f64, fine: f64, order: usize, label: &str) {
    let ratio = coarse / fine;
    let expected = 2f64.powi(order as i32);
    assert!(
        ratio > 0.8 * expected,
        "{label}: error ratio {ratio:.3} (errors {coarse:e}, {fine:e}), expected about {expected}"
    );
}

/// Velocity and pressure errors of the oscillating channel at `t = 1`:
/// `u = 1 + sin(t)/2` imposed at both ends, `p = -cos(t)/2 (x - 1/2)`.
fn channel_errors(scheme: FluidScheme, order: usize, dt: f64) -> (f64, f64) {
    let space = Arc::new(DgSpace::new(Mesh::uniform(0.0, 1.0, 8, false).unwrap()));
    let penalties = scheme != FluidScheme::Coupled;
    let params = FluidParameters {
        scheme,
        viscosity: 1e-3,
        order_time_integrator: order,
        start_with_low_order: false,
        time_step_size: dt,
        order_pressure_extrapolation: 1.min(order),
        solver_viscous: tight_solver(),
        solver_pressure_poisson: tight_solver(),
        solver_coupled: tight_solver(),
        projection: ProjectionParameters {
            use_divergence_penalty: penalties,
            use_continuity_penalty: penalties,
            solver_data: tight_solver(),
            ..Default::default()
        },
        ..Default::default()
    };
    let velocity: dgflow_solver::FieldFunction = Arc::new(|_, t| 1.0 + 0.5 * t.sin());
    let pressure = |x: f64, t: f64| -0.5 * t.cos() * (x - 0.5);
    let functions = FluidFunctions {
        initial_velocity: velocity.clone(),
        analytical_velocity: velocity.clone(),
        analytical_pressure: Arc::new(pressure),
        dirichlet_velocity: velocity,
        dirichlet_velocity_dt: Arc::new(|_, t| 0.5 * t.cos()),
        ..Default::default()
    };
    let operators = DgNavierStokesOperators::new(space.clone(), &params, &functions);
    let mut solver = FluidSolver::new(&params, 0, &operators, &functions).unwrap();
    solver.setup(false).unwrap();
    solver.set_time_step_size(dt);
    while !solver.advance_one_timestep(true).unwrap() {}

    assert!((solver.time() - 1.0).abs() < 1e-12);
    let velocity_error = space.l2_error(solver.velocity(), |_| 1.0 + 0.5 * 1f64.sin());
    let pressure_error = space.l2_error(solver.pressure(), |x| pressure(x, 1.0));
    (velocity_error, pressure_error)
}

/// Errors at the level of the solver tolerance count as converged.
fn assert_rate_or_exact(coarse: f64, fine: f64, order: usize, label: &str) {
    if fine < 1e-10 {
        return;
    }
    assert_rate(coarse, fine, order, label);
}

#[test]
fn test_dual_splitting_bdf_orders() {
    for order in 1..=3 {
        let coarse = fluid_error(FluidScheme::DualSplitting, order, 0.1);
        let fine = fluid_error(FluidScheme::DualSplitting, order, 0.05);
        assert_rate(coarse, fine, order, "dual splitting");
    }
}

#[test]
fn test_pressure_correction_bdf_orders() {
    for order in 1..=3 {
        let coarse = fluid_error(FluidScheme::PressureCorrection, order, 0.1);
        let fine = fluid_error(FluidScheme::PressureCorrection, order, 0.05);
        assert_rate(coarse, fine, order, "pressure correction");
    }
}

#[test]
fn test_coupled_bdf_orders() {
    for order in 1..=3 {
        let coarse = fluid_error(FluidScheme::Coupled, order, 0.1);
        let fine = fluid_error(FluidScheme::Coupled, order, 0.05);
        assert_rate(coarse, fine, order, "coupled");
    }
}

#[test]
fn test_scalar_bdf_orders() {
    for order in 1..=3 {
        let coarse = scalar_error(ScalarScheme::Bdf, order, 0.1);
        let fine = scalar_error(ScalarScheme::Bdf, order, 0.05);
        assert_rate(coarse, fine, order, "scalar BDF");
    }
}

#[test]
fn test_scalar_runge_kutta_orders() {
    for order in 1..=4 {
        let coarse = scalar_error(ScalarScheme::ExplicitRungeKutta, order, 0.1);
        let fine = scalar_error(ScalarScheme::ExplicitRungeKutta, order, 0.05);
        assert_rate(coarse, fine, order, "explicit Runge-Kutta");
    }
}

#[test]
fn test_low_order_start_still_converges() {
    let space = periodic_space();
    let params = FluidParameters {
        order_time_integrator: 2,
        start_with_low_order: true,
        time_step_size: 0.05,
        solver_viscous: tight_solver(),
        solver_pressure_poisson: tight_solver(),
        ..Default::default()
    };
    let functions = FluidFunctions {
        initial_velocity: Arc::new(|_, t| (2.0 * t).cos()),
        body_force: Arc::new(|_, t| -2.0 * (2.0 * t).sin()),
        ..Default::default()
    };
    let operators = DgNavierStokesOperators::new(space.clone(), &params, &functions);
    let mut solver = FluidSolver::new(&params, 0, &operators, &functions).unwrap();
    solver.setup(false).unwrap();
    solver.set_time_step_size(0.05);
    while !solver.advance_one_timestep(true).unwrap() {}
    assert_eq!(solver.step_number(), 21);
    assert!(space.l2_error(solver.velocity(), |_| 2.0f64.cos()) < 1e-2);
}

#[test]
fn test_dual_splitting_channel_orders() {
    for order in 1..=3 {
        let (u_coarse, p_coarse) = channel_errors(FluidScheme::DualSplitting, order, 0.1);
        let (u_fine, p_fine) = channel_errors(FluidScheme::DualSplitting, order, 0.05);
        assert_rate_or_exact(u_coarse, u_fine, order, "dual splitting channel velocity");
        assert_rate_or_exact(p_coarse, p_fine, order, "dual splitting channel pressure");
    }
}

#[test]
fn test_coupled_channel_orders() {
    for order in 1..=3 {
        let (u_coarse, p_coarse) = channel_errors(FluidScheme::Coupled, order, 0.1);
        let (u_fine, p_fine) = channel_errors(FluidScheme::Coupled, order, 0.05);
        assert_rate_or_exact(u_coarse, u_fine, order, "coupled channel velocity");
        assert_rate_or_exact(p_coarse, p_fine, order, "coupled channel pressure");
    }
}

#[test]
fn test_pressure_correction_channel_orders() {
    // the incremental scheme with first order pressure extrapolation is
    // limited to second order on bounded domains
    for order in 1..=2 {
        let (u_coarse, p_coarse) = channel_errors(FluidScheme::PressureCorrection, order, 0.1);
        let (u_fine, p_fine) = channel_errors(FluidScheme::PressureCorrection, order, 0.05);
        assert!(u_coarse < 1e-3 && u_fine < 1e-3, "velocity errors {u_coarse:e}, {u_fine:e}");
        assert_rate_or_exact(p_coarse, p_fine, order, "pressure correction channel pressure");
    }
}
