//! Client error types.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider error.
    #[error("provider error: {0}")]
    Provider(#[from] onair_providers::ProviderError),

    /// Daemon error.
    #[error(transparent)]
    Server(#[from] onair_server::ServerError),

    /// Logging setup error.
    #[error("logging error: {0}")]
    Tracing(#[from] onair_core::TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
