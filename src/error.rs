//! Error types for the Waypost core.

use thiserror::Error;

/// Main error type for Waypost operations.
#[derive(Error, Debug)]
pub enum WaypostError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A latitude or longitude outside the valid range
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// A search radius outside the allowed range
    #[error("Invalid radius: {0}")]
    InvalidRadius(String),
}

/// Result type alias for Waypost operations.
pub type Result<T> = std::result::Result<T, WaypostError>;
