use serde::{Deserialize, Serialize};

use crate::error::{ParameterError, Result};
use crate::solver_settings::{PreconditionerKind, SolverSettings, TimeStepCalculation};

/// Time integrator of the transported scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarScheme {
    /// Fully explicit Runge-Kutta, orders 1 to 4
    ExplicitRungeKutta,
    /// BDF with explicit convection and implicit diffusion, orders 1 to 3
    Bdf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarParameters {
    pub scheme: ScalarScheme,
    pub start_time: f64,
    pub end_time: f64,
    pub diffusivity: f64,
    pub order_time_integrator: usize,
    pub start_with_low_order: bool,
    pub time_step_calculation: TimeStepCalculation,
    pub time_step_size: f64,
    pub cfl: f64,
    /// Diffusion number bounding explicit steps when diffusion dominates
    pub diffusion_number: f64,
    pub cfl_exponent_fe_degree: f64,
    pub max_velocity: f64,
    pub upwind_factor: f64,
    pub ip_factor: f64,
    pub solver: SolverSettings,
    pub preconditioner: PreconditionerKind,
}

impl Default for ScalarParameters {
    fn default() -> Self {
        Self {
            scheme: ScalarScheme::ExplicitRungeKutta,
            start_time: 0.0,
            end_time: 1.0,
            diffusivity: 1e-2,
            order_time_integrator: 3,
            start_with_low_order: true,
            time_step_calculation: TimeStepCalculation::UserSpecified,
            time_step_size: 1e-2,
            cfl: 0.2,
            diffusion_number: 0.01,
            cfl_exponent_fe_degree: 2.0,
            max_velocity: 1.0,
            upwind_factor: 1.0,
            ip_factor: 1.0,
            solver: SolverSettings::new(1000, 1e-14, 1e-10),
            preconditioner: PreconditionerKind::InverseMassMatrix,
        }
    }
}

impl ScalarParameters {
    pub fn check(&self) -> Result<()> {
        if !(self.end_time > self.start_time) {
            return Err(ParameterError::invalid(
                "scalar.end_time",
                format!(
                    "end time {} must exceed start time {}",
                    self.end_time, self.start_time
                ),
            ));
        }
        if self.diffusivity < 0.0 {
            return Err(ParameterError::invalid(
                "scalar.diffusivity",
                "diffusivity must be non-negative",
            ));
        }
        let max_order = match self.scheme {
            ScalarScheme::ExplicitRungeKutta => 4,
            ScalarScheme::Bdf => 3,
        };
        if !(1..=max_order).contains(&self.order_time_integrator) {
            return Err(ParameterError::invalid(
                "scalar.order_time_integrator",
                format!(
                    "order {} not in 1..={} for {:?}",
                    self.order_time_integrator, max_order, self.scheme
                ),
            ));
        }
        match self.time_step_calculation {
            TimeStepCalculation::UserSpecified if !(self.time_step_size > 0.0) => {
                return Err(ParameterError::invalid(
                    "scalar.time_step_size",
                    "time step size must be positive",
                ));
            }
            TimeStepCalculation::ConstTimeStepCfl
                if !(self.cfl > 0.0) || !(self.max_velocity > 0.0) =>
            {
                return Err(ParameterError::invalid(
                    "scalar.cfl",
                    "CFL number and velocity estimate must be positive",
                ));
            }
            TimeStepCalculation::AdaptiveTimeStepCfl => {
                return Err(ParameterError::Unimplemented(
                    "adaptive time stepping".to_string(),
                ));
            }
            _ => {}
        }
        if self.ip_factor <= 0.0 || self.upwind_factor < 0.0 {
            return Err(ParameterError::invalid(
                "scalar.ip_factor",
                "interior penalty factor must be positive and upwind factor non-negative",
            ));
        }
        if self.scheme == ScalarScheme::Bdf {
            if self.preconditioner == PreconditionerKind::BlockJacobi {
                return Err(ParameterError::Unsupported(
                    "block Jacobi preconditioner for the scalar diffusion solver".to_string(),
                ));
            }
            self.solver.check("scalar.solver")?;
        }
        Ok(())
    }

    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("scalar time integrator", format!("{:?}", self.scheme)),
            ("scalar order", self.order_time_integrator.to_string()),
            ("diffusivity", format!("{:e}", self.diffusivity)),
            ("scalar start time", format!("{:e}", self.start_time)),
            ("scalar end time", format!("{:e}", self.end_time)),
        ]
    }
}
