//! Driver abstraction traits.
//!
//! This module defines the collaborator traits the query layer runs on. A
//! driver supplies connection checkout, statement preparation, positional
//! binding, execution and row fetching; everything above that (placeholder
//! rewriting, pagination, streaming) lives in [`crate::query`].
//!
//! Resources are scoped by ownership: dropping a `Connection`, a
//! `PreparedStatement` or a `RowCursor` releases it.

use crate::error::DriverError;
use crate::types::Value;
use async_trait::async_trait;
use std::time::Duration;

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name as reported by the database
    pub name: String,
    /// Column label (`AS` alias), when the driver distinguishes it from the name
    pub label: Option<String>,
}

impl ColumnInfo {
    /// Create column metadata without a separate label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    /// Set the column label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The identifier a materialized row uses for this column: the label when
    /// present, otherwise the name.
    pub fn identifier(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Source of database connections.
///
/// Implementations must support concurrent checkout: several executions of
/// the same query may hold connections at once.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Check out a connection. It is released when dropped.
    ///
    /// # Errors
    ///
    /// Returns `DriverError` if no connection can be established.
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError>;
}

/// An open database connection.
#[async_trait]
pub trait Connection: Send {
    /// Prepare a statement containing `?` positional markers.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Prepare` if the database rejects the text.
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>, DriverError>;
}

/// A prepared statement with positional parameters.
#[async_trait]
pub trait PreparedStatement: Send {
    /// Limit execution time. `None` means unlimited.
    fn set_query_timeout(&mut self, timeout: Option<Duration>);

    /// Bind a value at a 1-based position.
    ///
    /// # Errors
    ///
    /// Returns `DriverError::Bind` if the position or value is rejected.
    fn bind(&mut self, position: usize, value: Value) -> Result<(), DriverError>;

    /// Execute and return a cursor over the produced rows.
    async fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, DriverError>;

    /// Execute and return the number of affected rows.
    async fn execute_update(&mut self) -> Result<u64, DriverError>;
}

/// Forward-only cursor over the rows of one execution.
#[async_trait]
pub trait RowCursor: Send {
    /// Column metadata, in select-list order.
    fn columns(&self) -> &[ColumnInfo];

    /// Fetch the next row, or `None` once the cursor is exhausted.
    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError>;
}
