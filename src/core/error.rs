//! Error types for the data-access layer
//!
//! This module defines all error types that can occur while binding, executing
//! and mapping.

/// Result type alias for data-access operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for data-access operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// The SQL text declares a different number of distinct placeholders than values supplied
    #[error("Parameter count mismatch: command declares {expected} parameter(s), {actual} value(s) supplied")]
    ParameterCountMismatch { expected: usize, actual: usize },

    /// The command cannot be executed as given
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Failure surfaced by the underlying driver (open, execute, read or close)
    #[error("Driver error: {message}")]
    Driver {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A result value could not be converted into the target field
    #[error("Cannot map column '{column}' into {target}: {message}")]
    Mapping {
        column: String,
        target: String,
        message: String,
    },

    /// The cursor was already released
    #[error("Cursor is closed")]
    CursorClosed,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DatabaseError {
    /// Create a parameter count mismatch error
    pub fn parameter_count_mismatch(expected: usize, actual: usize) -> Self {
        DatabaseError::ParameterCountMismatch { expected, actual }
    }

    /// Create an invalid command error
    pub fn invalid_command<S: Into<String>>(msg: S) -> Self {
        DatabaseError::InvalidCommand(msg.into())
    }

    /// Create a driver error without an underlying source
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Driver {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a driver error wrapping the driver's own error
    pub fn driver_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        DatabaseError::Driver {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a mapping error
    pub fn mapping(column: &str, target: &str, message: impl Into<String>) -> Self {
        DatabaseError::Mapping {
            column: column.to_string(),
            target: target.to_string(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Config(msg.into())
    }

    /// Whether this error originated in the driver
    pub fn is_driver(&self) -> bool {
        matches!(self, DatabaseError::Driver { .. })
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Config(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::driver_with_source(err.to_string(), Box::new(err))
    }
}
