//! Error types for dgflow-solver

use dgflow_model::ParameterError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{solver} did not converge after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        solver: &'static str,
        iterations: usize,
        residual: f64,
    },

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Singular matrix in {0}")]
    Singular(&'static str),

    #[error(transparent)]
    Parameters(#[from] ParameterError),
}

pub(crate) fn check_dimension(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SolverError::DimensionMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}
