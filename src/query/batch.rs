//! Sequential execution of literal SQL statements.

use crate::driver::DataSource;
use crate::error::QueryError;
use crate::query::run_with_timeout;
use std::fmt;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// An ordered list of self-contained statements run on one connection.
///
/// Statements are executed as written; no placeholders are rewritten and no
/// parameters are bound. The first failure aborts the rest. Statements that
/// already ran are not rolled back.
#[derive(Clone)]
pub struct Batch {
    data_source: Arc<dyn DataSource>,
    statements: Vec<String>,
    timeout: Option<Duration>,
}

impl Batch {
    pub fn new<I, S>(data_source: Arc<dyn DataSource>, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_source,
            statements: statements.into_iter().map(Into::into).collect(),
            timeout: None,
        }
    }

    /// Read one statement per line, skipping blank lines.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by `reader`.
    pub fn from_reader<R: BufRead>(
        data_source: Arc<dyn DataSource>,
        reader: R,
    ) -> std::io::Result<Self> {
        let mut statements = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                statements.push(line);
            }
        }
        Ok(Self::new(data_source, statements))
    }

    /// Limit each statement execution. Zero means unlimited.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Execute every statement in order and return the summed affected rows.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BatchFailed` naming the 0-based index of the
    /// failing statement and the rows affected before it, or the acquire
    /// error if no connection could be checked out.
    pub async fn execute(&self) -> Result<u64, QueryError> {
        if self.statements.is_empty() {
            return Ok(0);
        }

        let mut connection = self.data_source.acquire().await?;
        let mut total = 0;

        for (index, sql) in self.statements.iter().enumerate() {
            debug!(index, sql = %sql, "executing batch statement");

            let result = match connection.prepare(sql).await {
                Ok(mut statement) => {
                    statement.set_query_timeout(self.timeout);
                    run_with_timeout(self.timeout, statement.execute_update()).await
                }
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(count) => total += count,
                Err(e) => {
                    warn!(index, error = %e, "batch aborted");
                    return Err(QueryError::BatchFailed {
                        index,
                        rows_affected: total,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(statements = self.statements.len(), rows_affected = total, "batch complete");
        Ok(total)
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("statements", &self.statements)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
