//! JSON output types for the CLI.
//!
//! With `--format json` every command prints exactly one response object to
//! stdout: a success response, or an [`ErrorResponse`] carrying the same
//! [`ErrorCode`](crate::error::ErrorCode) used as the exit status.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{DeepwalkError, ErrorCode};

/// Schema version stamped on every response.
pub const SCHEMA_VERSION: &str = "1";

/// Successful `outline` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Input file the outline was rendered from.
    pub file: String,
    /// Number of outline lines.
    pub lines: usize,
    /// The rendered outline.
    pub outline: String,
}

impl OutlineResponse {
    /// Create a response for `outline` rendered from `file`.
    pub fn new(file: impl Into<String>, outline: String) -> Self {
        OutlineResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: file.into(),
            lines: outline.lines().count(),
            outline,
        }
    }
}

/// Error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    /// Create from a DeepwalkError.
    pub fn from_error(err: &DeepwalkError) -> Self {
        ErrorInfo {
            code: ErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a DeepwalkError.
    pub fn from_error(err: &DeepwalkError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
