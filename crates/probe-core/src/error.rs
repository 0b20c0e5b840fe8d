//! Error types for the probe harness.
//!
//! Only conditions that abort a run are errors. Everything a probe can observe
//! about the server under test (HTTP failures, transport problems, timeouts)
//! is reported through [`crate::ProbeOutcome`] instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the probe harness.
#[derive(Debug, Error)]
pub enum ProbeError {
    // Launch errors
    #[error("Failed to launch {program}: {message}")]
    Launch {
        program: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Address {addr} is already accepting connections; refusing to launch")]
    PortInUse { addr: String },

    // Termination errors
    #[error("Failed to stop process {pid}: {message}")]
    Stop { pid: u32, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ProbeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ProbeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a launch error from a spawn failure.
    pub fn launch(program: impl Into<String>, err: std::io::Error) -> Self {
        let message = if err.kind() == std::io::ErrorKind::NotFound {
            "executable not found".to_string()
        } else {
            err.to_string()
        };
        ProbeError::Launch {
            program: program.into(),
            message,
            source: Some(err),
        }
    }

    /// Whether the error happened before any process was spawned.
    pub fn is_launch_error(&self) -> bool {
        matches!(self, ProbeError::Launch { .. } | ProbeError::PortInUse { .. })
    }
}
