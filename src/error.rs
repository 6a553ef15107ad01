// Domain error taxonomy
// Errors raised by the detectors, the evaluator and input validation

use std::path::PathBuf;
use thiserror::Error;

/// Errors shared by every detection stage
#[derive(Debug, Error, PartialEq)]
pub enum ExpressionError {
    /// A caller passed a value outside the operation's contract
    /// (bad direction flag, malformed interval, unsorted note table)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An expected per-file input is absent; the batch skips that file
    #[error("Missing input for '{stem}': {path}")]
    MissingInput { stem: String, path: PathBuf },

    /// A score was requested for a category with zero instances
    #[error("Division by zero: {0}")]
    DivisionByZero(String),
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

impl ExpressionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ExpressionError::InvalidArgument(message.into())
    }
}
