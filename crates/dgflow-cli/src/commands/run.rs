//! Runs a built-in case through the coupled time loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use dgflow_io::{RunReport, write_report};
use dgflow_model::{Parameters, RefinementLevels};
use dgflow_solver::{
    DgNavierStokesOperators, DgScalarOperators, DgSpace, FluidIntegrator, FluidSolver, Mesh,
    ScalarIntegrator, ScalarSolver, TimeLoopCoordinator,
};
use tracing::{error, info};

use crate::cases::Case;

#[derive(Args)]
pub struct RunArgs {
    /// Built-in case, see `dgflow cases`
    #[arg(short, long, default_value = "plug_flow")]
    pub case: String,

    /// Parameter file (JSON); the case defaults are used without one
    #[arg(short, long)]
    pub params: Option<PathBuf>,

    /// Output directory for the report
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Number of cells, overrides the mesh of the parameter set
    #[arg(long)]
    pub cells: Option<usize>,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let case = Case::from_name(&args.case)
        .ok_or_else(|| anyhow!("unknown case '{}', see `dgflow cases`", args.case))?;
    let mut params = match &args.params {
        Some(path) => dgflow_io::load_parameters(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => case.default_parameters(),
    };
    if let Some(cells) = args.cells {
        params.run.n_base_cells = cells;
        params.run.refine_space = RefinementLevels::fixed(0);
    }
    if params.run.periodic != case.is_periodic() {
        bail!(
            "case '{}' needs run.periodic = {}",
            case.name(),
            case.is_periodic()
        );
    }
    params.check()?;

    info!(
        case = case.name(),
        started_at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "dgflow run"
    );
    for (key, value) in params.summary() {
        info!("{key:<30} {value}");
    }

    let report = match run_case(case, &params) {
        Ok(report) => report,
        Err(err) => {
            error!("run failed: {err:#}");
            let failed = empty_report(case, &params).failed(format!("{err:#}"));
            write_report(&args.output, &failed)?;
            return Err(err);
        }
    };
    print_report(&report, &args.output)
}

fn empty_report(case: Case, params: &Parameters) -> RunReport {
    RunReport::new(
        case.name(),
        params.fluid.scheme.as_str(),
        format!("{:?}", params.scalar.scheme),
    )
}

/// Marches the case to its end time and measures the L2 errors.
pub fn run_case(case: Case, params: &Parameters) -> Result<RunReport> {
    let run = &params.run;
    let mesh = Mesh::uniform(run.left, run.right, run.n_cells(), run.periodic)?;
    let space = Arc::new(DgSpace::new(mesh));

    let fluid_functions = case.fluid_functions();
    let scalar_functions = case.scalar_functions(params);
    let fluid_operators =
        DgNavierStokesOperators::new(space.clone(), &params.fluid, &fluid_functions);
    let scalar_operators =
        DgScalarOperators::new(space.clone(), &params.scalar, &scalar_functions);

    let fluid = FluidSolver::new(
        &params.fluid,
        run.refine_time.min,
        &fluid_operators,
        &fluid_functions,
    )?;
    let scalar = ScalarSolver::new(
        &params.scalar,
        run.refine_time.min,
        run.velocity_coupling,
        &scalar_operators,
        &scalar_functions,
    )?;
    let mut coordinator = TimeLoopCoordinator::new(fluid, scalar);
    coordinator.setup(run.restart)?;
    let summary = coordinator.run()?;

    let fluid = coordinator.fluid();
    let scalar = coordinator.scalar();
    let (tf, ts) = (fluid.time(), scalar.time());
    let dissipation = fluid.dissipation();
    info!(
        convective = dissipation.convective,
        viscous = dissipation.viscous,
        divergence_penalty = dissipation.divergence_penalty,
        continuity_penalty = dissipation.continuity_penalty,
        "final dissipation"
    );
    let mut report = summary.to_report(
        case.name(),
        params.fluid.scheme.as_str(),
        &format!("{:?}", params.scalar.scheme),
        space.mesh().n_cells(),
    );
    report.errors.insert(
        "velocity".to_string(),
        space.l2_error(fluid.velocity(), |x| (fluid_functions.analytical_velocity)(x, tf)),
    );
    report.errors.insert(
        "pressure".to_string(),
        space.l2_error(fluid.pressure(), |x| (fluid_functions.analytical_pressure)(x, tf)),
    );
    report.errors.insert(
        "scalar".to_string(),
        space.l2_error(scalar.solution(), |x| (scalar_functions.analytical_solution)(x, ts)),
    );
    Ok(report)
}

fn print_report(report: &RunReport, output: &Path) -> Result<()> {
    let paths = write_report(output, report)
        .with_context(|| format!("failed to write report to {}", output.display()))?;

    println!(
        "{}: {} fluid / {} scalar steps, dt = {:e}, t = {}",
        report.case_name,
        report.fluid_steps,
        report.scalar_steps,
        report.time_step_size,
        report.final_time
    );
    for (field, error) in &report.errors {
        println!("  L2 error {field:<9} {error:.6e}");
    }
    for (solve, stats) in &report.solver_statistics {
        println!(
            "  {solve:<28} {:>6} solves, {:>6.1} avg / {:>4} max iterations",
            stats.solves,
            stats.average_iterations(),
            stats.max_iterations
        );
    }
    println!("report: {}", paths.json_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coarse(case: Case) -> Parameters {
        let mut params = case.default_parameters();
        params.run.n_base_cells = 8;
        params.run.refine_space = RefinementLevels::fixed(0);
        params.fluid.end_time = 0.5;
        params.scalar.end_time = 0.5;
        params.fluid.time_step_size = 0.02;
        params.scalar.time_step_size = 0.02;
        params
    }

    #[test]
    fn test_plug_flow_keeps_uniform_velocity() {
        let report = run_case(Case::PlugFlow, &coarse(Case::PlugFlow)).unwrap();
        assert_eq!(report.fluid_steps, 25);
        assert_eq!(report.scalar_steps, 25);
        assert!(report.errors["velocity"] < 1e-6);
        assert!(report.errors["pressure"] < 1e-6);
        assert!(report.errors["scalar"] < 0.1);
        assert!(report.solver_statistics.contains_key("fluid.pressure_poisson"));
    }

    #[test]
    fn test_channel_follows_the_inflow_velocity() {
        let report =
            run_case(Case::OscillatingChannel, &coarse(Case::OscillatingChannel)).unwrap();
        assert!((report.final_time - 0.5).abs() < 1e-12);
        assert!(report.errors["velocity"] < 1e-2);
        assert!(report.errors["scalar"] < 0.2);
    }

    #[test]
    fn test_report_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_case(Case::PlugFlow, &coarse(Case::PlugFlow)).unwrap();
        print_report(&report, dir.path()).unwrap();
        let loaded = dgflow_io::load_report(dir.path().join("plug_flow.json")).unwrap();
        assert_eq!(loaded.fluid_steps, report.fluid_steps);
        assert_eq!(loaded.errors, report.errors);
    }
}
