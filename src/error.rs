//! Error types for the Throttle service.

use thiserror::Error;

/// Main error type for Throttle operations.
///
/// Admission checks never fail; these errors only arise while configuring,
/// starting or stopping the service.
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background eviction task errors
    #[error("Evictor error: {0}")]
    Evictor(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ThrottleError {
    fn from(err: config::ConfigError) -> Self {
        ThrottleError::Config(err.to_string())
    }
}

/// Result type alias for Throttle operations.
pub type Result<T> = std::result::Result<T, ThrottleError>;
