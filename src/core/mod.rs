/// Core Module
///
/// Shared infrastructure for the adapter: the error type and the database
/// layer (connection lifecycle, statement execution, bind values).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{AdapterError, Result};
