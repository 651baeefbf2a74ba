//! Coupled time loop of fluid and scalar.
//!
//! Both integrators march with one common step size. Per iteration the
//! fluid advances first, its new velocity is handed to the scalar, and then
//! the scalar advances. An integrator that has finished keeps reporting so
//! but is no longer stepped; one that has not reached its own start time
//! only advances its clock.

use std::collections::BTreeMap;
use std::time::Instant;

use dgflow_io::{RunReport, SolveStatistics};
use tracing::{debug, info};

use crate::error::{Result, SolverError};
use crate::time_integration::{FluidIntegrator, ScalarIntegrator};
use crate::time_step_calculation::adjust_time_step_to_hit_end_time;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub fluid_steps: usize,
    pub scalar_steps: usize,
    pub time_step_size: f64,
    pub final_time: f64,
    /// Keyed `fluid.<solve>` and `scalar.<solve>`
    pub statistics: BTreeMap<String, SolveStatistics>,
    pub wall_time_seconds: f64,
}

impl RunSummary {
    pub fn to_report(
        &self,
        case_name: &str,
        fluid_scheme: &str,
        scalar_scheme: &str,
        n_cells: usize,
    ) -> RunReport {
        let mut report = RunReport::new(case_name, fluid_scheme, scalar_scheme);
        report.n_cells = n_cells;
        report.fluid_steps = self.fluid_steps;
        report.scalar_steps = self.scalar_steps;
        report.time_step_size = self.time_step_size;
        report.final_time = self.final_time;
        report.wall_time_seconds = self.wall_time_seconds;
        report.solver_statistics = self.statistics.clone();
        report
    }
}

pub struct TimeLoopCoordinator<F, S> {
    fluid: F,
    scalar: S,
    start_time: f64,
    time_step_size: f64,
}

impl<F: FluidIntegrator, S: ScalarIntegrator> TimeLoopCoordinator<F, S> {
    pub fn new(fluid: F, scalar: S) -> Self {
        let start_time = fluid.start_time().min(scalar.start_time());
        Self {
            fluid,
            scalar,
            start_time,
            time_step_size: 0.0,
        }
    }

    pub fn fluid(&self) -> &F {
        &self.fluid
    }

    pub fn scalar(&self) -> &S {
        &self.scalar
    }

    pub fn into_parts(self) -> (F, S) {
        (self.fluid, self.scalar)
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn time_step_size(&self) -> f64 {
        self.time_step_size
    }

    /// Sets up both integrators, aligns their clocks and step sizes.
    pub fn setup(&mut self, restart: bool) -> Result<()> {
        self.fluid.setup(restart)?;
        self.scalar.setup(restart)?;
        self.set_start_time();
        self.synchronize_time_step_size()?;
        Ok(())
    }

    /// Moves both clocks to the earlier of the two start times.
    pub fn set_start_time(&mut self) {
        self.start_time = self.fluid.start_time().min(self.scalar.start_time());
        self.fluid.set_time(self.start_time);
        self.scalar.set_time(self.start_time);
    }

    /// Uses the smaller requested step, shrunk so that an integer number
    /// of steps reaches the fluid end time.
    pub fn synchronize_time_step_size(&mut self) -> Result<f64> {
        let dt_fluid = self.fluid.calculate_time_step_size()?;
        let dt_scalar = self.scalar.calculate_time_step_size()?;
        let dt = dt_fluid.min(dt_scalar);
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolverError::Configuration(format!(
                "invalid time step size {dt}"
            )));
        }
        let dt = adjust_time_step_to_hit_end_time(self.start_time, self.fluid.end_time(), dt);
        info!(dt_fluid, dt_scalar, dt, "synchronized time step size");

        self.fluid.set_time_step_size(dt);
        self.scalar.set_time_step_size(dt);
        self.time_step_size = dt;
        Ok(dt)
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let timer = Instant::now();
        let fluid_start_step = self.fluid.step_number();
        let scalar_start_step = self.scalar.step_number();
        info!(
            start = self.start_time,
            fluid_end = self.fluid.end_time(),
            scalar_end = self.scalar.end_time(),
            dt = self.time_step_size,
            "starting time loop"
        );

        self.scalar.set_velocity(self.fluid.time(), self.fluid.velocity());
        let mut fluid_finished = self.fluid.is_finished();
        let mut scalar_finished = self.scalar.is_finished();
        while !(fluid_finished && scalar_finished) {
            fluid_finished = self.fluid.advance_one_timestep(!fluid_finished)?;
            self.scalar.set_velocity(self.fluid.time(), self.fluid.velocity());
            scalar_finished = self.scalar.advance_one_timestep(!scalar_finished)?;
            debug!(
                fluid_time = self.fluid.time(),
                scalar_time = self.scalar.time(),
                "time step done"
            );
        }

        let mut statistics = BTreeMap::new();
        for (name, stats) in self.fluid.statistics() {
            statistics.insert(format!("fluid.{name}"), *stats);
        }
        for (name, stats) in self.scalar.statistics() {
            statistics.insert(format!("scalar.{name}"), *stats);
        }
        let summary = RunSummary {
            fluid_steps: self.fluid.step_number() - fluid_start_step,
            scalar_steps: self.scalar.step_number() - scalar_start_step,
            time_step_size: self.time_step_size,
            final_time: self.fluid.time().max(self.scalar.time()),
            statistics,
            wall_time_seconds: timer.elapsed().as_secs_f64(),
        };
        info!(
            fluid_steps = summary.fluid_steps,
            scalar_steps = summary.scalar_steps,
            final_time = summary.final_time,
            wall_time = summary.wall_time_seconds,
            "time loop finished"
        );
        Ok(summary)
    }
}
