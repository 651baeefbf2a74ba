//! Time integrators of the fluid and the scalar field.

pub mod bdf;
pub mod fluid;
pub mod scalar;

pub use bdf::{MAX_ORDER, TimeStepState, linear_combination};
pub use fluid::{
    CoupledSolver, Dissipation, DualSplittingSolver, FluidHistory, FluidIntegrator, FluidSolver,
    PressureCorrectionSolver,
};
pub use scalar::{
    BdfScalarSolver, ExplicitRungeKuttaSolver, ScalarIntegrator, ScalarSolver, TransportVelocity,
    VelocityHistory,
};

/// Tolerance when comparing times against start and end times.
pub const TIME_EPSILON: f64 = 1.0e-10;
