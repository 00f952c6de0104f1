//! Error handling for millkit
//!
//! Provides the error types shared by every crate in the workspace:
//! - Configuration errors (missing, out-of-range or inconsistent parameters)
//! - A unified [`Error`] used at crate boundaries
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Configuration error type
///
/// Represents problems with tool, job or planner parameters detected
/// before any geometry is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required parameter is missing
    #[error("Missing required parameter: {name}")]
    Missing {
        /// The parameter name.
        name: String,
    },

    /// A parameter value is outside its valid range
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        /// The parameter name.
        name: String,
        /// The offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A parameter value is invalid for a reason other than range
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue {
        /// The parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for a value that must be strictly positive.
    pub fn not_positive(name: impl Into<String>, value: f64) -> Self {
        ConfigError::OutOfRange {
            name: name.into(),
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        }
    }
}

/// Main error type for millkit
///
/// A unified error type that can represent any error raised outside the
/// planners themselves (configuration, I/O, serialization).
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
