//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the daemon.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (lock file, state file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// State serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another live instance holds the lock.
    #[error("onair is already running (pid {pid}, lock file: {path})")]
    AlreadyRunning { path: String, pid: u32 },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an already running error.
    pub fn already_running(path: impl Into<String>, pid: u32) -> Self {
        Self::AlreadyRunning {
            path: path.into(),
            pid,
        }
    }
}
