//! Error types for billstat
//!
//! This module defines the error types used throughout the billstat library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use billstat_core::error::{BillstatError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to BillstatError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for billstat operations
///
/// Covers everything from IO and parse failures while loading data to
/// rejected report parameters and failing usage stores.
#[derive(Error, Debug)]
pub enum BillstatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Report range ends before it starts
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Requested start of the range
        from: NaiveDateTime,
        /// Requested end of the range
        to: NaiveDateTime,
    },

    /// Parse error with file context
    #[error("Parse error in {file}: {error}")]
    Parse {
        /// The file that caused the error
        file: PathBuf,
        /// The error message
        error: String,
    },

    /// A usage store query failed
    #[error("Usage store '{store}' failed: {message}")]
    Store {
        /// Name of the store that failed
        store: String,
        /// The error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results in billstat
///
/// # Example
///
/// ```
/// use billstat_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, BillstatError>;
