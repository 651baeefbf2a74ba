//! Error types for dgflow-model

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParameterError>;

/// A parameter set that cannot be run.
///
/// Every variant is fatal: parameters are validated once, eagerly, before
/// any operator or integrator is constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Invalid parameter `{parameter}`: {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Refinement of {what} must be fixed, got range {min}..={max}")]
    RefinementRange {
        what: &'static str,
        min: u32,
        max: u32,
    },
}

impl ParameterError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        ParameterError::Invalid {
            parameter,
            reason: reason.into(),
        }
    }
}
