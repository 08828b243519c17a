//! Error types for the inshad application
//!
//! Module-specific error type using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the inshad application
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote API transport or protocol errors
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),

    /// The remote rejected job creation; the caller must resubmit
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the inshad Error
pub type Result<T> = std::result::Result<T, Error>;
