//! Discontinuous Galerkin flow solver with scalar transport.
//!
//! The incompressible Navier-Stokes equations are integrated with BDF
//! schemes (coupled, dual splitting or pressure correction) and a scalar
//! field is transported by the resulting velocity, either with explicit
//! Runge-Kutta or BDF. A [`TimeLoopCoordinator`] marches both with one
//! common step size.
//!
//! Layers, bottom up:
//! - [`mesh`], [`space`]: 1-D mesh and the DG P1 space on it
//! - [`operators`]: matrix-free mass, Laplace, gradient, divergence,
//!   convective and transport operators
//! - [`solvers`]: CG, GMRES, direct solves and preconditioners
//! - [`projection`]: divergence and continuity penalty terms
//! - [`time_integration`]: BDF constants, fluid and scalar integrators
//! - [`time_loop`]: synchronization of fluid and scalar

pub mod error;
pub mod functions;
pub mod mesh;
pub mod operators;
pub mod projection;
pub mod solvers;
pub mod space;
pub mod time_integration;
pub mod time_loop;
pub mod time_step_calculation;

pub use error::{Result, SolverError};
pub use functions::{FieldFunction, FluidFunctions, ScalarFunctions};
pub use mesh::{BOUNDARY_LEFT, BOUNDARY_RIGHT, Face, Mesh};
pub use operators::{
    AffineOperator, DgNavierStokesOperators, DgScalarOperators, EvaluationOperator,
    LinearOperator, SpatialOperatorSet,
};
pub use projection::{ProjectionOperator, ProjectionOperatorData, ProjectionSolver};
pub use space::DgSpace;
pub use time_integration::{
    Dissipation, FluidIntegrator, FluidSolver, ScalarIntegrator, ScalarSolver, TimeStepState,
};
pub use time_loop::{RunSummary, TimeLoopCoordinator};
