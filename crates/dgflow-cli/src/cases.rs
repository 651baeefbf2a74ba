//! Built-in 1-D test cases with analytical solutions.
//!
//! In one dimension an incompressible velocity is constant in space, so
//! every case prescribes a spatially uniform flow and puts the interesting
//! behaviour into the transported scalar.

use std::f64::consts::PI;
use std::sync::Arc;

use dgflow_model::{EquationType, Parameters};
use dgflow_solver::{FluidFunctions, ScalarFunctions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// Periodic uniform flow advecting and diffusing a sine wave
    PlugFlow,
    /// Bounded channel with an oscillating inflow velocity
    OscillatingChannel,
}

impl Case {
    pub const ALL: [Case; 2] = [Case::PlugFlow, Case::OscillatingChannel];

    pub fn name(self) -> &'static str {
        match self {
            Case::PlugFlow => "plug_flow",
            Case::OscillatingChannel => "oscillating_channel",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Case::PlugFlow => "periodic, u = 1, decaying sine wave transported by the flow",
            Case::OscillatingChannel => {
                "bounded, u = 1 + sin(t)/2 imposed at both ends, linear pressure, inflow of a sine profile"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|case| case.name() == name)
    }

    pub fn is_periodic(self) -> bool {
        matches!(self, Case::PlugFlow)
    }

    /// Defaults tuned for the case; a parameter file replaces them entirely.
    pub fn default_parameters(self) -> Parameters {
        let mut params = Parameters::default();
        params.run.periodic = self.is_periodic();
        match self {
            Case::PlugFlow => {
                params.fluid.equation_type = EquationType::NavierStokes;
                params.scalar.diffusivity = 1e-2;
            }
            Case::OscillatingChannel => {
                params.fluid.viscosity = 1e-3;
                params.scalar.diffusivity = 0.0;
                params.fluid.projection.use_continuity_penalty = false;
            }
        }
        params
    }

    pub fn fluid_functions(self) -> FluidFunctions {
        match self {
            Case::PlugFlow => FluidFunctions {
                initial_velocity: dgflow_solver::functions::constant(1.0),
                analytical_velocity: dgflow_solver::functions::constant(1.0),
                ..Default::default()
            },
            Case::OscillatingChannel => {
                let velocity: dgflow_solver::FieldFunction =
                    Arc::new(|_, t| 1.0 + 0.5 * t.sin());
                FluidFunctions {
                    initial_velocity: velocity.clone(),
                    analytical_velocity: velocity.clone(),
                    // zero-mean pressure on [0, 1] balancing the acceleration
                    analytical_pressure: Arc::new(|x, t| -0.5 * t.cos() * (x - 0.5)),
                    dirichlet_velocity: velocity,
                    dirichlet_velocity_dt: Arc::new(|_, t| 0.5 * t.cos()),
                    ..Default::default()
                }
            }
        }
    }

    pub fn scalar_functions(self, params: &Parameters) -> ScalarFunctions {
        match self {
            Case::PlugFlow => {
                let kappa = params.scalar.diffusivity;
                let exact: dgflow_solver::FieldFunction = Arc::new(move |x, t| {
                    (-kappa * 4.0 * PI * PI * t).exp() * (2.0 * PI * (x - t)).sin()
                });
                ScalarFunctions {
                    initial_solution: exact.clone(),
                    analytical_solution: exact,
                    transport_velocity: dgflow_solver::functions::constant(1.0),
                    ..Default::default()
                }
            }
            Case::OscillatingChannel => {
                // displacement of a fluid particle, integral of the velocity
                let exact: dgflow_solver::FieldFunction =
                    Arc::new(|x, t| (2.0 * PI * (x - t - 0.5 * (1.0 - t.cos()))).sin());
                ScalarFunctions {
                    initial_solution: exact.clone(),
                    analytical_solution: exact.clone(),
                    dirichlet: exact,
                    transport_velocity: Arc::new(|_, t| 1.0 + 0.5 * t.sin()),
                    ..Default::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for case in Case::ALL {
            assert_eq!(Case::from_name(case.name()), Some(case));
        }
        assert_eq!(Case::from_name("taylor_green"), None);
    }

    #[test]
    fn test_default_parameters_are_valid() {
        for case in Case::ALL {
            let params = case.default_parameters();
            assert!(params.check().is_ok(), "{}", case.name());
            assert_eq!(params.run.periodic, case.is_periodic());
        }
    }

    #[test]
    fn test_channel_scalar_satisfies_transport_equation() {
        let case = Case::OscillatingChannel;
        let functions = case.scalar_functions(&case.default_parameters());
        let c = &functions.analytical_solution;
        let w = &functions.transport_velocity;
        let (x, t, h) = (0.3, 0.7, 1e-5);
        let dc_dt = (c(x, t + h) - c(x, t - h)) / (2.0 * h);
        let dc_dx = (c(x + h, t) - c(x - h, t)) / (2.0 * h);
        assert!((dc_dt + w(x, t) * dc_dx).abs() < 1e-6);
    }

    #[test]
    fn test_channel_pressure_balances_acceleration() {
        let functions = Case::OscillatingChannel.fluid_functions();
        let p = &functions.analytical_pressure;
        let (x, t, h) = (0.2, 1.3, 1e-5);
        let dp_dx = (p(x + h, t) - p(x - h, t)) / (2.0 * h);
        let du_dt = (functions.dirichlet_velocity_dt)(x, t);
        assert!((du_dt + dp_dx).abs() < 1e-8);
    }
}
