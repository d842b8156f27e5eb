//! Error types for satmap.
//!
//! Only failures that must abort an operation are represented here. Recoverable
//! configuration problems (a measurement budget smaller than the group count, an
//! unset experiential peak, an unknown palette name) are logged and replaced by a
//! safe default at the point where they are detected, so a partially instrumented
//! machine still produces a diagram.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for measurement sessions, exports and rendering.
#[derive(Error, Debug)]
pub enum Error {
    /// The capture backend refused an operation (start/stop/configure).
    #[error("Capture error: {0}")]
    Capture(String),

    /// The capture result file is missing, unreadable or corrupt.
    #[error("Cannot read capture results from {path}: {message}")]
    ResultFile { path: PathBuf, message: String },

    /// Session lifecycle misuse (unregistered tag, merge after close, ...)
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration that cannot be substituted by a default.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numeric export refused because the data is not fully valid.
    #[error("Export error: {0}")]
    Export(String),

    /// Drawing backend failure.
    #[error("Render error: {0}")]
    Render(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a capture error.
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    /// Create a result-file error for `path`.
    pub fn result_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ResultFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Create a render error from any displayable backend error.
    pub fn render(message: impl std::fmt::Display) -> Self {
        Self::Render(message.to_string())
    }

    /// Whether this error aborts the whole measurement session.
    ///
    /// Capture and result-file errors mean no aggregate may be produced.
    pub fn is_fatal_capture(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::ResultFile { .. })
    }
}

// =================================================================================================
// Tests
// =================================================================================================
