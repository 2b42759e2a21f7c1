//! # rowstream
//!
//! Fluent SQL queries with windowed, streaming execution.
//!
//! Statements are written with `:name` placeholders and configured through
//! chainable builders. Queries fetch their rows window by window
//! (`LIMIT <offset>,<count>`), optionally re-issuing the statement until a
//! short window signals the end, and deliver rows either as a `Stream` or to
//! a push-style [`Subscriber`](query::Subscriber) that can cancel at any time.
//!
//! ## Example
//!
//! ```no_run
//! # use rowstream::*;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sql = Sql::connect("sqlite::memory:")?;
//!
//! sql.batch([
//!     "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, year INTEGER)",
//!     "INSERT INTO books (title, year) VALUES ('Dune', 1965)",
//!     "INSERT INTO books (title, year) VALUES ('Emma', 1815)",
//! ])
//! .execute()
//! .await?;
//!
//! // Every book, 100 rows per window
//! let rows = sql
//!     .query("SELECT title FROM books WHERE year > :year")
//!     .bind("year", 1900)
//!     .order_by(OrderBy::asc("title"))
//!     .limit(0, 100)
//!     .all_rows(true)
//!     .fetch_all()
//!     .await?;
//!
//! for row in rows {
//!     println!("{:?}", row.get_by_name_as::<String>("title")?);
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod query;
pub mod types;

// Re-export public API
pub use client::Sql;
pub use config::DataSourceConfig;
pub use error::{ConnectionError, DriverError, Error, ErrorKind, QueryError, RowError};
pub use query::{
    Batch, Direction, OrderBy, Parameters, Query, Row, Subscriber, Subscription, Update, Window,
};
pub use types::{FromValue, Value};
