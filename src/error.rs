//! Error types for the TipScribe admission service.

use thiserror::Error;

/// Main error type for TipScribe rate limiting operations.
///
/// A rejected request is never an error; see [`crate::ratelimit::Decision`].
#[derive(Error, Debug)]
pub enum TipscribeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A decision was requested for a policy that was never configured
    #[error("Unknown rate limit policy: {0}")]
    UnknownPolicy(String),

    /// gRPC server errors
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::transport::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for TipscribeError {
    fn from(err: ::config::ConfigError) -> Self {
        TipscribeError::Config(err.to_string())
    }
}

impl From<TipscribeError> for tonic::Status {
    fn from(err: TipscribeError) -> Self {
        match err {
            TipscribeError::UnknownPolicy(_) => tonic::Status::not_found(err.to_string()),
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

/// Result type alias for TipScribe operations.
pub type Result<T> = std::result::Result<T, TipscribeError>;
