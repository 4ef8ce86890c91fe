//! Error types for the reasonflow orchestrator.
//!
//! Only programming-contract violations (malformed configuration, broken
//! descriptor wiring) surface as `Err` from the public entry points.
//! Stage-level failures and timeouts are captured on the
//! [`ReasoningResult`](crate::result::ReasoningResult) instead and never
//! re-raised to the caller.

use thiserror::Error;

/// The main error type for reasonflow operations.
#[derive(Debug, Error)]
pub enum ReasonflowError {
    /// The run configuration failed validation.
    #[error("{0}")]
    Config(#[from] ConfigValidationError),

    /// The pipeline descriptors are wired inconsistently.
    #[error("Pipeline wiring error: {0}")]
    Wiring(String),
}

/// Error raised when a [`ReasoningConfig`](crate::config::ReasoningConfig)
/// fails validation.
#[derive(Debug, Clone, Error)]
#[error("Invalid configuration: {message}")]
pub struct ConfigValidationError {
    /// The offending field.
    pub field: &'static str,
    /// The error message.
    pub message: String,
}

impl ConfigValidationError {
    /// Creates a new validation error for a field.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
