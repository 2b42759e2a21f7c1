//! Error types for rowstream.
//!
//! This module defines domain-specific error types organized by functional area.

use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query, update and batch execution errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Result accessor errors
    #[error(transparent)]
    Row(#[from] RowError),

    /// Errors raised directly by a driver
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// I/O errors while reading batch input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to data source configuration and connection checkout.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to acquire a connection from the data source
    #[error("Failed to acquire connection: {0}")]
    AcquireFailed(String),

    /// Failed to open the underlying database
    #[error("Failed to open {target}: {message}")]
    OpenFailed { target: String, message: String },

    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),
}

/// Errors related to query, update and batch execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Connection could not be acquired
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement preparation failed
    #[error("Statement preparation failed: {0}")]
    PrepareFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    ExecutionFailed(String),

    /// Query timeout
    #[error("Query timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Parameter binding error
    #[error("Parameter binding error for parameter {index}: {message}")]
    ParameterBindingError { index: usize, message: String },

    /// Positional and named parameters were mixed
    #[error("Invalid parameter shape: {0}")]
    ParameterShape(String),

    /// Window cannot drive an all-rows query
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// A batch statement failed; earlier statements stay applied
    #[error("Batch statement {index} failed after {rows_affected} affected rows: {message}")]
    BatchFailed {
        index: usize,
        rows_affected: u64,
        message: String,
    },
}

/// Errors raised by `Row` accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    /// Ordinal outside `1..=len`
    #[error("Ordinal out-of-range [{ordinal}] (row has {len} columns)")]
    OrdinalOutOfRange { ordinal: usize, len: usize },

    /// No column with that name
    #[error("Unknown name [{0}]")]
    UnknownColumn(String),

    /// Stored value does not have the requested type
    #[error("Column [{column}] holds {actual}, incompatible with {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors reported by driver implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Could not connect to the database
    #[error("Connect error: {0}")]
    Connect(String),

    /// Statement text rejected by the database
    #[error("Prepare error: {0}")]
    Prepare(String),

    /// Value could not be bound at the given 1-based position
    #[error("Bind error at position {position}: {message}")]
    Bind { position: usize, message: String },

    /// Statement execution failed
    #[error("Execute error: {0}")]
    Execute(String),

    /// Row fetch failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Statement interrupted after its timeout elapsed
    #[error("Statement interrupted after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Coarse classification of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolved or incompatible value, or an accessor lookup miss
    Binding,
    /// Connection, prepare, execute or fetch failure
    Execution,
    /// Caller misuse of the API
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Binding => write!(f, "BINDING"),
            ErrorKind::Execution => write!(f, "EXECUTION"),
            ErrorKind::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection(e) => e.kind(),
            Error::Query(e) => e.kind(),
            Error::Row(e) => e.kind(),
            Error::Driver(e) => e.kind(),
            Error::Io(_) => ErrorKind::Execution,
        }
    }
}

impl ConnectionError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::InvalidParameter { .. } | ConnectionError::ParseError(_) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::Execution,
        }
    }
}

impl QueryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Connection(e) => e.kind(),
            QueryError::ParameterBindingError { .. } => ErrorKind::Binding,
            QueryError::ParameterShape(_) | QueryError::InvalidWindow(_) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::Execution,
        }
    }
}

impl RowError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RowError::TypeMismatch { .. } => ErrorKind::Binding,
            _ => ErrorKind::Configuration,
        }
    }
}

impl DriverError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Bind { .. } => ErrorKind::Binding,
            _ => ErrorKind::Execution,
        }
    }
}

// Driver failures surface from the engine as execution failures.
impl From<DriverError> for QueryError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Connect(message) => {
                QueryError::Connection(ConnectionError::AcquireFailed(message))
            }
            DriverError::Prepare(message) => QueryError::PrepareFailed(message),
            DriverError::Bind { position, message } => QueryError::ParameterBindingError {
                index: position,
                message,
            },
            DriverError::Timeout { timeout_ms } => QueryError::Timeout { timeout_ms },
            e => QueryError::ExecutionFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::ParameterShape(err.to_string())
    }
}
