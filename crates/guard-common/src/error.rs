//! Error types for the guardrail core

use thiserror::Error;

/// Guardrail error type
#[derive(Error, Debug)]
pub enum GuardError {
    /// A classifier scan exceeded its deadline
    #[error("classifier timed out: {0}")]
    ClassifierTimeout(String),

    /// A classifier failed internally
    #[error("classifier failed: {0}")]
    ClassifierFailed(String),

    /// A pattern could not be compiled
    #[error("invalid pattern `{name}`: {reason}")]
    InvalidPattern {
        /// Pattern entry name
        name: String,
        /// Compile failure description
        reason: String,
    },

    /// A masking rule is missing or malformed
    #[error("masking rule error: {0}")]
    MaskingRule(String),

    /// Configuration was rejected
    #[error("config error: {0}")]
    ConfigError(String),

    /// Audit store failure
    #[error("audit error: {0}")]
    AuditError(String),
}

/// Result type for the guardrail core
pub type GuardResult<T> = Result<T, GuardError>;
