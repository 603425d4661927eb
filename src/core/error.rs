/// Adapter Error Module
///
/// This module defines the error types raised by the adapter. Every failure
/// except a failed statement execution travels through `AdapterError`; that
/// one case is reported as `ExecOutcome::Failed` instead.
use thiserror::Error;

/// Message used whenever an operation needs a live connection and has none.
pub const NO_CONNECTION: &str = "No database connection";

/// Error type for every adapter operation.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Host and/or schema missing at connect time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No live handle when one is required, or the backend refused to prepare a statement
    #[error("Connection error: {0}")]
    Connection(String),

    /// Empty host, schema or SQL handed to the adapter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failures reported by the native SQLite client, including failed connects
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Reading a configuration file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid TOML or has the wrong shape
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AdapterError {
    pub(crate) fn no_connection() -> Self {
        AdapterError::Connection(NO_CONNECTION.to_string())
    }
}

/// Type alias for Result to use AdapterError as the error type.
pub type Result<T> = std::result::Result<T, AdapterError>;
