//! Parameters of the incompressible Navier-Stokes solver.

use serde::{Deserialize, Serialize};

use crate::error::{ParameterError, Result};
use crate::solver_settings::{PreconditionerKind, SolverSettings, TimeStepCalculation};

/// Splitting strategy of the fluid time integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluidScheme {
    /// Monolithic velocity-pressure solve every step
    Coupled,
    /// Convective, viscous, pressure Poisson and projection sub-steps
    DualSplitting,
    /// Momentum predictor followed by a pressure increment correction
    PressureCorrection,
}

impl FluidScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            FluidScheme::Coupled => "BDFCoupledSolution",
            FluidScheme::DualSplitting => "BDFDualSplittingScheme",
            FluidScheme::PressureCorrection => "BDFPressureCorrection",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationType {
    Stokes,
    NavierStokes,
}

/// Scaling of the local penalty coefficients of the projection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypePenaltyParameter {
    ConstantCoefficient,
    ConvectiveTerm,
    ViscousAndConvectiveTerms,
}

/// Velocity components penalised by the continuity penalty term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuityPenaltyComponents {
    All,
    Normal,
}

/// Solver used for the penalised projection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverProjection {
    /// Cell-local direct solve (divergence penalty only)
    Lu,
    /// Global preconditioned conjugate gradient
    Pcg,
}

/// Pressure is only defined up to a constant for pure Neumann problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustPressureLevel {
    ApplyZeroMeanValue,
    ApplyAnalyticalMeanValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParameters {
    pub use_divergence_penalty: bool,
    pub use_continuity_penalty: bool,
    pub divergence_penalty_factor: f64,
    pub continuity_penalty_factor: f64,
    pub type_penalty_parameter: TypePenaltyParameter,
    pub continuity_penalty_components: ContinuityPenaltyComponents,
    pub solver_projection: SolverProjection,
    pub preconditioner_projection: PreconditionerKind,
    /// Recompute the preconditioner every time the penalty parameters change
    pub update_preconditioner_projection: bool,
    pub solver_data: SolverSettings,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            use_divergence_penalty: true,
            use_continuity_penalty: true,
            divergence_penalty_factor: 1.0,
            continuity_penalty_factor: 1.0,
            type_penalty_parameter: TypePenaltyParameter::ConvectiveTerm,
            continuity_penalty_components: ContinuityPenaltyComponents::Normal,
            solver_projection: SolverProjection::Pcg,
            preconditioner_projection: PreconditionerKind::InverseMassMatrix,
            update_preconditioner_projection: true,
            solver_data: SolverSettings::new(1000, 1e-14, 1e-10),
        }
    }
}

impl ProjectionParameters {
    pub fn any_penalty(&self) -> bool {
        self.use_divergence_penalty || self.use_continuity_penalty
    }

    fn check(&self) -> Result<()> {
        if self.use_continuity_penalty && !self.use_divergence_penalty {
            return Err(ParameterError::Unsupported(
                "continuity penalty without divergence penalty".to_string(),
            ));
        }
        if self.divergence_penalty_factor < 0.0 || self.continuity_penalty_factor < 0.0 {
            return Err(ParameterError::invalid(
                "projection",
                "penalty factors must be non-negative",
            ));
        }
        if self.use_continuity_penalty && self.solver_projection == SolverProjection::Lu {
            return Err(ParameterError::Unsupported(
                "cell-local LU projection solver cannot handle the continuity penalty".to_string(),
            ));
        }
        self.solver_data.check("projection.solver_data")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidParameters {
    pub scheme: FluidScheme,
    pub equation_type: EquationType,
    pub start_time: f64,
    pub end_time: f64,
    /// Kinematic viscosity
    pub viscosity: f64,
    /// BDF order, 1 to 3
    pub order_time_integrator: usize,
    /// Ramp the BDF order up during the first steps instead of seeding the
    /// history from the analytical solution
    pub start_with_low_order: bool,
    pub time_step_calculation: TimeStepCalculation,
    pub time_step_size: f64,
    pub cfl: f64,
    pub cfl_exponent_fe_degree: f64,
    /// Velocity estimate used by `ConstTimeStepCfl`
    pub max_velocity: f64,
    /// Scaling of the Lax-Friedrichs dissipation of the convective flux
    pub upwind_factor: f64,
    /// Interior penalty factor of the viscous term and the pressure Poisson operator
    pub ip_factor: f64,
    /// Extrapolation order of the pressure gradient in the momentum predictor
    /// of the pressure-correction scheme (0 drops the gradient)
    pub order_pressure_extrapolation: usize,
    pub adjust_pressure_level: AdjustPressureLevel,
    pub projection: ProjectionParameters,
    pub solver_viscous: SolverSettings,
    pub preconditioner_viscous: PreconditionerKind,
    pub solver_pressure_poisson: SolverSettings,
    pub preconditioner_pressure_poisson: PreconditionerKind,
    pub solver_coupled: SolverSettings,
}

impl Default for FluidParameters {
    fn default() -> Self {
        Self {
            scheme: FluidScheme::DualSplitting,
            equation_type: EquationType::NavierStokes,
            start_time: 0.0,
            end_time: 1.0,
            viscosity: 1e-2,
            order_time_integrator: 2,
            start_with_low_order: true,
            time_step_calculation: TimeStepCalculation::UserSpecified,
            time_step_size: 1e-2,
            cfl: 0.2,
            cfl_exponent_fe_degree: 1.5,
            max_velocity: 1.0,
            upwind_factor: 1.0,
            ip_factor: 1.0,
            order_pressure_extrapolation: 1,
            adjust_pressure_level: AdjustPressureLevel::ApplyZeroMeanValue,
            projection: ProjectionParameters::default(),
            solver_viscous: SolverSettings::new(1000, 1e-14, 1e-10),
            preconditioner_viscous: PreconditionerKind::PointJacobi,
            solver_pressure_poisson: SolverSettings::new(1000, 1e-14, 1e-10),
            preconditioner_pressure_poisson: PreconditionerKind::PointJacobi,
            solver_coupled: SolverSettings {
                max_iter: 2000,
                abs_tol: 1e-14,
                rel_tol: 1e-10,
                max_krylov_size: 200,
            },
        }
    }
}

impl FluidParameters {
    /// Validates the parameter set, rejecting unsupported combinations
    /// of strategy selector, penalty flags and preconditioners.
    pub fn check(&self) -> Result<()> {
        if !(self.end_time > self.start_time) {
            return Err(ParameterError::invalid(
                "fluid.end_time",
                format!(
                    "end time {} must exceed start time {}",
                    self.end_time, self.start_time
                ),
            ));
        }
        if self.viscosity < 0.0 {
            return Err(ParameterError::invalid(
                "fluid.viscosity",
                "viscosity must be non-negative",
            ));
        }
        if !(1..=3).contains(&self.order_time_integrator) {
            return Err(ParameterError::invalid(
                "fluid.order_time_integrator",
                format!("BDF order {} not in 1..=3", self.order_time_integrator),
            ));
        }
        match self.time_step_calculation {
            TimeStepCalculation::UserSpecified if !(self.time_step_size > 0.0) => {
                return Err(ParameterError::invalid(
                    "fluid.time_step_size",
                    "time step size must be positive",
                ));
            }
            TimeStepCalculation::ConstTimeStepCfl
                if !(self.cfl > 0.0) || !(self.max_velocity > 0.0) =>
            {
                return Err(ParameterError::invalid(
                    "fluid.cfl",
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
                "fluid.ip_factor",
                "interior penalty factor must be positive and upwind factor non-negative",
            ));
        }

        match self.scheme {
            FluidScheme::Coupled => {
                if self.projection.any_penalty() {
                    return Err(ParameterError::Unsupported(
                        "penalty terms are only available for the splitting schemes".to_string(),
                    ));
                }
                self.solver_coupled.check("fluid.solver_coupled")?;
            }
            FluidScheme::DualSplitting | FluidScheme::PressureCorrection => {
                self.projection.check()?;
                self.solver_pressure_poisson
                    .check("fluid.solver_pressure_poisson")?;
                if matches!(
                    self.preconditioner_pressure_poisson,
                    PreconditionerKind::InverseMassMatrix | PreconditionerKind::BlockJacobi
                ) {
                    return Err(ParameterError::Unsupported(format!(
                        "preconditioner {:?} for the pressure Poisson solver",
                        self.preconditioner_pressure_poisson
                    )));
                }
            }
        }
        if self.scheme == FluidScheme::PressureCorrection
            && self.order_pressure_extrapolation > self.order_time_integrator
        {
            return Err(ParameterError::invalid(
                "fluid.order_pressure_extrapolation",
                format!(
                    "pressure extrapolation order {} exceeds BDF order {}",
                    self.order_pressure_extrapolation, self.order_time_integrator
                ),
            ));
        }
        if self.preconditioner_viscous == PreconditionerKind::BlockJacobi {
            return Err(ParameterError::Unsupported(
                "block Jacobi preconditioner for the viscous solver".to_string(),
            ));
        }
        self.solver_viscous.check("fluid.solver_viscous")
    }

    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("temporal discretization", self.scheme.as_str().to_string()),
            ("equation type", format!("{:?}", self.equation_type)),
            ("start time", format!("{:e}", self.start_time)),
            ("end time", format!("{:e}", self.end_time)),
            ("viscosity", format!("{:e}", self.viscosity)),
            ("order of time integrator", self.order_time_integrator.to_string()),
            ("start with low order", self.start_with_low_order.to_string()),
            (
                "time step calculation",
                format!("{:?}", self.time_step_calculation),
            ),
        ];
        if self.scheme != FluidScheme::Coupled {
            rows.push((
                "divergence penalty",
                self.projection.use_divergence_penalty.to_string(),
            ));
            rows.push((
                "continuity penalty",
                self.projection.use_continuity_penalty.to_string(),
            ));
        }
        if self.scheme == FluidScheme::PressureCorrection {
            rows.push((
                "order pressure extrapolation",
                self.order_pressure_extrapolation.to_string(),
            ));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(FluidParameters::default().check().is_ok());
    }

    #[test]
    fn rejects_continuity_penalty_alone() {
        let mut params = FluidParameters::default();
        params.projection.use_divergence_penalty = false;
        params.projection.use_continuity_penalty = true;
        assert!(matches!(
            params.check(),
            Err(ParameterError::Unsupported(_))
        ));
    }

    #[test]
    fn rejects_penalty_with_coupled_scheme() {
        let params = FluidParameters {
            scheme: FluidScheme::Coupled,
            ..Default::default()
        };
        assert!(matches!(
            params.check(),
            Err(ParameterError::Unsupported(_))
        ));
    }

    #[test]
    fn coupled_scheme_without_penalty_is_valid() {
        let mut params = FluidParameters {
            scheme: FluidScheme::Coupled,
            ..Default::default()
        };
        params.projection.use_divergence_penalty = false;
        params.projection.use_continuity_penalty = false;
        assert!(params.check().is_ok());
    }

    #[test]
    fn adaptive_time_stepping_is_unimplemented() {
        let params = FluidParameters {
            time_step_calculation: TimeStepCalculation::AdaptiveTimeStepCfl,
            ..Default::default()
        };
        assert!(matches!(
            params.check(),
            Err(ParameterError::Unimplemented(_))
        ));
    }

    #[test]
    fn lu_projection_requires_divergence_penalty_only() {
        let mut params = FluidParameters::default();
        params.projection.solver_projection = SolverProjection::Lu;
        assert!(params.check().is_err());

        params.projection.use_continuity_penalty = false;
        assert!(params.check().is_ok());
    }

    #[test]
    fn pressure_extrapolation_bounded_by_order() {
        let params = FluidParameters {
            scheme: FluidScheme::PressureCorrection,
            order_time_integrator: 1,
            order_pressure_extrapolation: 2,
            ..Default::default()
        };
        assert!(params.check().is_err());
    }
}
