//! CLI error type and exit codes.
//!
//! Every failure the `deepwalk` binary can report is a [`DeepwalkError`].
//! Engine errors convert into it with `?`; [`ErrorCode`] maps each variant to
//! a stable process exit code that also appears in JSON error output.

use std::fmt;

use thiserror::Error;

use deepwalk_core::{BuildError, WalkError};

// ============================================================================
// Error Codes
// ============================================================================

/// Stable error codes for exit status and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Bad command-line input.
    InvalidArguments = 2,
    /// The input document could not be read or parsed.
    InputError = 3,
    /// The traversal aborted.
    TraversalFailed = 4,
    /// Engine construction or output failed.
    InternalError = 10,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the CLI.
#[derive(Debug, Error)]
pub enum DeepwalkError {
    /// Invalid arguments from the caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Input file exists but could not be read.
    #[error("failed to read {path}: {message}")]
    ReadFailed { path: String, message: String },

    /// Input is not valid JSON.
    #[error("invalid JSON in {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Output could not be written.
    #[error("failed to write output: {message}")]
    WriteFailed { message: String },

    /// The engine could not be built.
    #[error("engine construction failed: {0}")]
    Build(#[from] BuildError),

    /// The traversal aborted.
    #[error("traversal failed: {0}")]
    Walk(#[from] WalkError),
}

impl DeepwalkError {
    /// Create an invalid-arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DeepwalkError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

impl From<&DeepwalkError> for ErrorCode {
    fn from(err: &DeepwalkError) -> Self {
        match err {
            DeepwalkError::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            DeepwalkError::FileNotFound { .. } => ErrorCode::InputError,
            DeepwalkError::ReadFailed { .. } => ErrorCode::InputError,
            DeepwalkError::InvalidJson { .. } => ErrorCode::InputError,
            DeepwalkError::WriteFailed { .. } => ErrorCode::InternalError,
            DeepwalkError::Build(_) => ErrorCode::InternalError,
            DeepwalkError::Walk(_) => ErrorCode::TraversalFailed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
