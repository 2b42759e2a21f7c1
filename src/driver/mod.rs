//! Driver layer for database communication.
//!
//! This module provides the driver abstraction the query layer is written
//! against, plus a SQLite implementation.
//!
//! # Architecture
//!
//! The driver layer is organized into:
//! - `protocol` - Driver traits (`DataSource`, `Connection`, `PreparedStatement`, `RowCursor`)
//! - `cursor` - Buffered in-memory row cursor
//! - `sqlite` - SQLite driver (feature `sqlite`)
//!
//! # Example
//!
//! ```no_run
//! use rowstream::driver::{DataSource, SqliteDataSource};
//! use rowstream::types::Value;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let data_source = SqliteDataSource::memory()?;
//!
//! let mut connection = data_source.acquire().await?;
//! let mut stmt = connection.prepare("SELECT ? + 1").await?;
//! stmt.bind(1, Value::Integer(41))?;
//!
//! let mut cursor = stmt.execute_query().await?;
//! while let Some(row) = cursor.next_row().await? {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cursor;
#[cfg(test)]
pub(crate) mod mock;
pub mod protocol;
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export commonly used types
pub use cursor::BufferedCursor;
pub use protocol::{ColumnInfo, Connection, DataSource, PreparedStatement, RowCursor};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDataSource;
