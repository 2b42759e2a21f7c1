//! Entry point for building statements against one data source.

use crate::driver::DataSource;
use crate::error::Error;
use crate::query::{Batch, Query, Update};
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

/// Builds queries, updates and batches bound to one data source.
///
/// Cloning is cheap; clones share the data source.
///
/// # Example
///
/// ```no_run
/// use rowstream::Sql;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sql = Sql::connect("sqlite:///var/lib/app/books.db?query_timeout=30")?;
///
/// let affected = sql
///     .update("UPDATE books SET stock = stock - 1 WHERE id = :id")
///     .bind("id", 7)
///     .execute()
///     .await?;
///
/// let first = sql.query("SELECT * FROM books").fetch_all().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Sql {
    data_source: Arc<dyn DataSource>,
    query_timeout: Duration,
}

impl Sql {
    /// Wrap an existing data source.
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            query_timeout: Duration::ZERO,
        }
    }

    /// Open a SQLite data source from a connection string.
    ///
    /// The `query_timeout` of the connection string becomes the default
    /// timeout of every query and update.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the string is invalid or the database
    /// cannot be opened.
    #[cfg(feature = "sqlite")]
    pub fn connect(connection_string: &str) -> Result<Self, Error> {
        use crate::config::DataSourceConfig;
        use crate::driver::SqliteDataSource;

        let config: DataSourceConfig = connection_string.parse()?;
        let data_source = SqliteDataSource::open(&config)?;
        Ok(Self::new(Arc::new(data_source)).with_query_timeout(config.query_timeout))
    }

    /// Default timeout for queries, updates and batches. Zero means unlimited.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Start a SELECT query.
    pub fn query(&self, sql: impl Into<String>) -> Query {
        Query::new(Arc::clone(&self.data_source), sql).query_timeout(self.query_timeout)
    }

    /// Start a DML statement.
    pub fn update(&self, sql: impl Into<String>) -> Update {
        Update::new(Arc::clone(&self.data_source), sql).query_timeout(self.query_timeout)
    }

    /// Build a batch from statements.
    pub fn batch<I, S>(&self, statements: I) -> Batch
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Batch::new(Arc::clone(&self.data_source), statements).query_timeout(self.query_timeout)
    }

    /// Build a batch from line-oriented text, one statement per non-blank line.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails.
    pub fn batch_from_reader<R: BufRead>(&self, reader: R) -> Result<Batch, Error> {
        Ok(Batch::from_reader(Arc::clone(&self.data_source), reader)?
            .query_timeout(self.query_timeout))
    }
}

impl fmt::Debug for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sql")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockSource;
    use crate::error::{ConnectionError, ErrorKind};
    use std::io::Cursor;

    #[test]
    fn test_default_timeout_applies_to_statements() {
        let sql = Sql::new(Arc::new(MockSource::new())).with_query_timeout(Duration::from_secs(10));

        assert_eq!(sql.query("SELECT 1").timeout(), Some(Duration::from_secs(10)));

        let sql = sql.with_query_timeout(Duration::ZERO);
        assert_eq!(sql.query("SELECT 1").timeout(), None);
    }

    #[test]
    fn test_batch_from_reader() {
        let sql = Sql::new(Arc::new(MockSource::new()));
        let batch = sql
            .batch_from_reader(Cursor::new("DELETE FROM a\n\nDELETE FROM b"))
            .unwrap();

        assert_eq!(batch.statements(), ["DELETE FROM a", "DELETE FROM b"]);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_connect_rejects_bad_string() {
        let err = Sql::connect("postgres://localhost/db").unwrap_err();

        assert!(matches!(err, Error::Connection(ConnectionError::ParseError(_))));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_connect_memory() {
        let sql = Sql::connect("sqlite::memory:").unwrap();

        let rows = sql.query("SELECT 1 AS one").fetch_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name_as::<i64>("one").unwrap(), Some(1));
    }
}
