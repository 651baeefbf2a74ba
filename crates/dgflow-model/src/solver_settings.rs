use serde::{Deserialize, Serialize};

use crate::error::{ParameterError, Result};

/// Iteration budget of an inner linear solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum number of iterations before the solve is declared failed
    pub max_iter: usize,
    /// Absolute residual tolerance
    pub abs_tol: f64,
    /// Residual tolerance relative to the initial residual
    pub rel_tol: f64,
    /// Krylov basis size before a GMRES restart (ignored by CG)
    pub max_krylov_size: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            abs_tol: 1e-12,
            rel_tol: 1e-8,
            max_krylov_size: 100,
        }
    }
}

impl SolverSettings {
    pub fn new(max_iter: usize, abs_tol: f64, rel_tol: f64) -> Self {
        Self {
            max_iter,
            abs_tol,
            rel_tol,
            ..Default::default()
        }
    }

    pub(crate) fn check(&self, parameter: &'static str) -> Result<()> {
        if self.max_iter == 0 {
            return Err(ParameterError::invalid(parameter, "max_iter must be positive"));
        }
        if !(self.abs_tol > 0.0) || !(self.rel_tol > 0.0) {
            return Err(ParameterError::invalid(
                parameter,
                format!(
                    "tolerances must be positive (abs_tol={}, rel_tol={})",
                    self.abs_tol, self.rel_tol
                ),
            ));
        }
        if self.max_krylov_size == 0 {
            return Err(ParameterError::invalid(
                parameter,
                "max_krylov_size must be positive",
            ));
        }
        Ok(())
    }
}

/// How the step size of an integrator is chosen at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeStepCalculation {
    /// Use `time_step_size` as given
    UserSpecified,
    /// Constant step from the CFL condition and a velocity estimate
    ConstTimeStepCfl,
    /// Step size adapted to the current velocity every step
    AdaptiveTimeStepCfl,
}

/// Preconditioner of a symmetric positive definite sub-solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreconditionerKind {
    None,
    InverseMassMatrix,
    PointJacobi,
    BlockJacobi,
}
