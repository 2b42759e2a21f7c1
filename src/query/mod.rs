//! Query building and execution.
//!
//! This module provides the fluent statement types and the machinery that
//! runs them against a [`DataSource`](crate::driver::DataSource).
//!
//! # Overview
//!
//! The query module is organized into:
//! - `parameters` - `:name` placeholder rewriting and parameter binding
//! - `statement` - ORDER BY and pagination composition
//! - `results` - Materialized rows
//! - `cursor` - Windowed execution state machine
//! - `subscriber` - Push-style consumption with cancellation
//! - `select` - Fluent SELECT queries
//! - `update` - Single DML statements
//! - `batch` - Sequential literal statements
//!
//! # Example
//!
//! ```no_run
//! use rowstream::query::{Query, Update};
//! use rowstream::driver::SqliteDataSource;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let data_source = Arc::new(SqliteDataSource::memory()?);
//!
//! Update::new(data_source.clone(), "CREATE TABLE books (title TEXT, year INTEGER)")
//!     .execute()
//!     .await?;
//! Update::new(data_source.clone(), "INSERT INTO books VALUES (:title, :year )")
//!     .bind("title", "Dune")
//!     .bind("year", 1965)
//!     .execute()
//!     .await?;
//!
//! let rows = Query::new(data_source, "SELECT * FROM books")
//!     .limit(0, 100)
//!     .all_rows(true)
//!     .fetch_all()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod cursor;
pub mod parameters;
pub mod results;
pub mod select;
pub mod statement;
pub mod subscriber;
pub mod update;

// Re-export commonly used types
pub use batch::Batch;
pub use cursor::WindowCursor;
pub use parameters::{bind, rewrite, OrdinalMap, Parameters, POSITIONAL_KEY};
pub use results::Row;
pub use select::Query;
pub use statement::{
    Direction, LimitOffset, OffsetFetch, OrderBy, Pagination, StatementBuilder, StatementType,
    Window,
};
pub use subscriber::{Subscriber, Subscription};
pub use update::Update;

use crate::error::{DriverError, QueryError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Await a driver operation, failing with `QueryError::Timeout` after `limit`.
pub(crate) async fn run_with_timeout<T, F>(limit: Option<Duration>, operation: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match limit {
        Some(limit) => timeout(limit, operation)
            .await
            .map_err(|_| QueryError::Timeout {
                timeout_ms: limit.as_millis() as u64,
            })?
            .map_err(QueryError::from),
        None => operation.await.map_err(QueryError::from),
    }
}
