//! Space-time data of a flow/transport problem.
//!
//! All functions take `(x, t)`. Defaults are zero so a case only has to set
//! what it uses.

use std::fmt;
use std::sync::Arc;

pub type FieldFunction = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

pub fn zero() -> FieldFunction {
    Arc::new(|_, _| 0.0)
}

pub fn constant(value: f64) -> FieldFunction {
    Arc::new(move |_, _| value)
}

#[derive(Clone)]
pub struct FluidFunctions {
    pub initial_velocity: FieldFunction,
    pub initial_pressure: FieldFunction,
    pub analytical_velocity: FieldFunction,
    pub analytical_pressure: FieldFunction,
    pub body_force: FieldFunction,
    /// Velocity on Dirichlet boundaries
    pub dirichlet_velocity: FieldFunction,
    /// Time derivative of the Dirichlet velocity, enters the pressure Neumann data
    pub dirichlet_velocity_dt: FieldFunction,
}

impl Default for FluidFunctions {
    fn default() -> Self {
        Self {
            initial_velocity: zero(),
            initial_pressure: zero(),
            analytical_velocity: zero(),
            analytical_pressure: zero(),
            body_force: zero(),
            dirichlet_velocity: zero(),
            dirichlet_velocity_dt: zero(),
        }
    }
}

impl fmt::Debug for FluidFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluidFunctions").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ScalarFunctions {
    pub initial_solution: FieldFunction,
    pub analytical_solution: FieldFunction,
    pub source: FieldFunction,
    /// Scalar value imposed on inflow boundaries
    pub dirichlet: FieldFunction,
    /// Transport velocity used with `VelocityCoupling::Prescribed`
    pub transport_velocity: FieldFunction,
}

impl Default for ScalarFunctions {
    fn default() -> Self {
        Self {
            initial_solution: zero(),
            analytical_solution: zero(),
            source: zero(),
            dirichlet: zero(),
            transport_velocity: zero(),
        }
    }
}

impl fmt::Debug for ScalarFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunctions").finish_non_exhaustive()
    }
}
