//! Parameter model for dgflow
//!
//! Plain data describing one coupled flow/transport run. Every struct derives
//! serde with field defaults, so a parameter file only needs to name the
//! values that differ from the defaults. Validation happens once, eagerly,
//! through [`Parameters::check`].

pub mod error;
pub mod fluid;
pub mod run;
pub mod scalar;
pub mod solver_settings;

pub use error::{ParameterError, Result};
pub use fluid::{
    AdjustPressureLevel, ContinuityPenaltyComponents, EquationType, FluidParameters, FluidScheme,
    ProjectionParameters, SolverProjection, TypePenaltyParameter,
};
pub use run::{RefinementLevels, RunParameters, VelocityCoupling};
pub use scalar::{ScalarParameters, ScalarScheme};
pub use solver_settings::{PreconditionerKind, SolverSettings, TimeStepCalculation};

use serde::{Deserialize, Serialize};

/// Complete parameter set of a coupled run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub run: RunParameters,
    pub fluid: FluidParameters,
    pub scalar: ScalarParameters,
}

impl Parameters {
    pub fn check(&self) -> Result<()> {
        self.run.check()?;
        self.fluid.check()?;
        self.scalar.check()?;
        if self.fluid.time_step_calculation != self.scalar.time_step_calculation {
            return Err(ParameterError::Unsupported(format!(
                "fluid uses {:?} but scalar uses {:?}; both must use the same time step calculation",
                self.fluid.time_step_calculation, self.scalar.time_step_calculation
            )));
        }
        Ok(())
    }

    /// Key/value rows for logging the setup of a run.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("dimension", self.run.dimension.to_string()),
            ("cells", self.run.n_cells().to_string()),
            ("periodic", self.run.periodic.to_string()),
            (
                "velocity coupling",
                format!("{:?}", self.run.velocity_coupling),
            ),
        ];
        rows.extend(self.fluid.summary());
        rows.extend(self.scalar.summary());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_runnable() {
        assert!(Parameters::default().check().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "fluid": { "viscosity": 0.5, "scheme": "Coupled",
            "projection": { "use_divergence_penalty": false, "use_continuity_penalty": false } } }"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.fluid.viscosity, 0.5);
        assert_eq!(params.fluid.scheme, FluidScheme::Coupled);
        assert_eq!(params.scalar, ScalarParameters::default());
        assert!(params.check().is_ok());
    }

    #[test]
    fn mismatched_step_calculation_is_rejected() {
        let mut params = Parameters::default();
        params.scalar.time_step_calculation = TimeStepCalculation::ConstTimeStepCfl;
        assert!(matches!(
            params.check(),
            Err(ParameterError::Unsupported(_))
        ));
    }

    #[test]
    fn summary_names_the_scheme() {
        let rows = Parameters::default().summary();
        assert!(
            rows.iter()
                .any(|(k, v)| *k == "temporal discretization" && v == "BDFDualSplittingScheme")
        );
    }
}
