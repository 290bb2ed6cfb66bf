//! Error types for the Term reconciliation library.
//!
//! All errors are represented by the [`TermError`] enum, derived with
//! `thiserror`. Comparators only ever *return* these errors; the
//! [`ComparisonSuite`](crate::core::ComparisonSuite) converts every database
//! level failure into an ERROR component result, so callers of a well-formed
//! suite only need to handle [`TermError::Configuration`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the reconciliation library.
#[derive(Error, Debug)]
pub enum TermError {
    /// Malformed or missing table descriptor, option or parameter.
    ///
    /// This is the only error that is surfaced to the caller of a suite run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The metadata query for a table failed or the table does not exist.
    #[error("Schema lookup failed for '{table}': {message}")]
    SchemaLookup {
        /// Qualified name of the table that was introspected
        table: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A count or value query could not execute.
    #[error("Connection error during {operation}: {message}")]
    Connection {
        /// The operation that was being performed (e.g. "row count")
        operation: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Timeout or transient network failure reported by the query layer.
    ///
    /// The library never retries; an outer policy may re-run the comparison.
    #[error("Transient error during {operation}: {message}")]
    Transient {
        /// The operation that was being performed
        operation: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Security-related error (invalid identifiers and the like).
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, TermError>`.
pub type Result<T> = std::result::Result<T, TermError>;

/// Coarse classification of an error, recorded in ERROR component results
/// so that an outer retry policy can decide whether to re-run a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    /// Invalid input; retrying will not help
    Configuration,
    /// Metadata lookup failed
    SchemaLookup,
    /// Query could not execute
    Connection,
    /// Timeout or transient network failure; a retry may succeed
    Transient,
    /// Anything else
    Internal,
}

impl TermError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a schema lookup error without an underlying cause.
    pub fn schema_lookup(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaLookup {
            table: table.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a schema lookup error wrapping its cause.
    pub fn schema_lookup_with_source(
        table: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::SchemaLookup {
            table: table.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a connection error without an underlying cause.
    pub fn connection(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection error wrapping its cause.
    pub fn connection_with_source(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Connection {
            operation: operation.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a transient error.
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the coarse class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            TermError::Configuration(_) | TermError::SecurityError(_) => ErrorClass::Configuration,
            TermError::SchemaLookup { .. } => ErrorClass::SchemaLookup,
            TermError::Connection { .. } | TermError::DataFusion(_) | TermError::Arrow(_) => {
                ErrorClass::Connection
            }
            TermError::Transient { .. } => ErrorClass::Transient,
            TermError::Serialization(_) | TermError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Returns true if an outer policy may retry the failed comparison.
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Returns true if this error must be surfaced to the caller instead of
    /// being captured in a component result.
    pub fn is_fail_fast(&self) -> bool {
        self.class() == ErrorClass::Configuration
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        TermError::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                TermError::Configuration(inner) => {
                    TermError::Configuration(format!("{msg}: {inner}"))
                }
                TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
                other => TermError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
