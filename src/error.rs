//! Error taxonomy for the assumption guardian
//!
//! Configuration errors (`UnknownTestFamily`, `MissingValidator`) are fatal and
//! surface to the caller. `InvalidSampleShape` and `ValidatorTimeout` are
//! recovered locally: the first by returning an empty diagnostics payload,
//! the second by marking the assumption indeterminate in the verdict.

use crate::assumption::AssumptionName;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuardianError {
    #[error("Unknown test family: '{name}'")]
    UnknownTestFamily { name: String },

    #[error("No validator registered for required assumption '{assumption}' (test family '{family}')")]
    MissingValidator {
        assumption: AssumptionName,
        family: String,
    },

    #[error("Invalid sample shape: {reason}")]
    InvalidSampleShape { reason: String },

    #[error("Validator for '{assumption}' exceeded its budget of {budget_ms}ms")]
    ValidatorTimeout {
        assumption: AssumptionName,
        budget_ms: u64,
    },

    #[error("Invalid sample: {reason}")]
    InvalidSample { reason: String },

    #[error("Test family '{family}' expects {expected} data")]
    DatasetMismatch { family: String, expected: String },

    #[error("Assumption '{assumption}' requires {expected} data")]
    IncompatibleDataset {
        assumption: AssumptionName,
        expected: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl GuardianError {
    /// True for errors that the guardian recovers from without failing the
    /// whole request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GuardianError::InvalidSampleShape { .. } | GuardianError::ValidatorTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GuardianError>;
