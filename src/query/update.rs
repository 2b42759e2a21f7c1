//! Single-statement DML execution.

use crate::driver::DataSource;
use crate::error::QueryError;
use crate::query::parameters::{self, ParameterSlot, Parameters};
use crate::query::run_with_timeout;
use crate::types::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A configured INSERT, UPDATE, DELETE or DDL statement.
///
/// Parameters work as they do for [`Query`](crate::query::Query): named
/// `:name` placeholders or positional values, never both.
#[derive(Clone)]
pub struct Update {
    data_source: Arc<dyn DataSource>,
    sql: String,
    parameters: ParameterSlot,
    timeout: Option<Duration>,
}

impl Update {
    pub fn new(data_source: Arc<dyn DataSource>, sql: impl Into<String>) -> Self {
        Self {
            data_source,
            sql: sql.into(),
            parameters: ParameterSlot::default(),
            timeout: None,
        }
    }

    /// Bind a named parameter.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Append a positional parameter.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value);
        self
    }

    /// Replace all parameters.
    pub fn parameters(mut self, parameters: impl Into<Parameters>) -> Self {
        self.parameters.replace(parameters.into());
        self
    }

    /// Limit statement execution. Zero means unlimited.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Execute and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if parameters are misconfigured, or if acquiring,
    /// preparing, binding or executing fails.
    pub async fn execute(&self) -> Result<u64, QueryError> {
        let parameters = self.parameters.resolve()?;
        let (sql, ordinals) = parameters::rewrite(&self.sql);

        debug!(sql = %sql, parameters = %parameters, "executing update");

        let mut connection = self.data_source.acquire().await?;
        let mut statement = connection.prepare(&sql).await?;
        statement.set_query_timeout(self.timeout);
        parameters::bind(statement.as_mut(), parameters, &ordinals)?;

        let count = run_with_timeout(self.timeout, statement.execute_update()).await?;
        debug!(rows_affected = count, "update complete");
        Ok(count)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("sql", &self.sql)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockConn, MockSource, MockStatement};
    use crate::driver::{Connection, PreparedStatement};
    use crate::error::DriverError;
    use mockall::predicate::eq;

    fn source_with(stmt: impl FnMut() -> MockStatement + Send + 'static) -> Arc<dyn DataSource> {
        let stmt = Arc::new(std::sync::Mutex::new(stmt));
        let mut source = MockSource::new();
        source.expect_acquire().times(1).returning(move || {
            let stmt = Arc::clone(&stmt);
            let mut conn = MockConn::new();
            conn.expect_prepare().times(1).returning(move |sql| {
                assert_eq!(sql.to_string(), "UPDATE books SET price = ? WHERE id = ?");
                let mut make = stmt.lock().unwrap();
                Ok(Box::new((*make)()) as Box<dyn PreparedStatement>)
            });
            Ok(Box::new(conn) as Box<dyn Connection>)
        });
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_named_update() {
        let source = source_with(|| {
            let mut stmt = MockStatement::new();
            stmt.expect_set_query_timeout().return_const(());
            stmt.expect_bind()
                .with(eq(1), eq(Value::Float(9.5)))
                .times(1)
                .returning(|_, _| Ok(()));
            stmt.expect_bind()
                .with(eq(2), eq(Value::Integer(7)))
                .times(1)
                .returning(|_, _| Ok(()));
            stmt.expect_execute_update().times(1).returning(|| Ok(1));
            stmt
        });

        let count = Update::new(source, "UPDATE books SET price = :price WHERE id = :id")
            .bind("id", 7i64)
            .bind("price", 9.5)
            .execute()
            .await
            .unwrap();

        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_positional_update() {
        let source = source_with(|| {
            let mut stmt = MockStatement::new();
            stmt.expect_set_query_timeout()
                .with(eq(Some(Duration::from_secs(3))))
                .return_const(());
            stmt.expect_bind().times(2).returning(|_, _| Ok(()));
            stmt.expect_execute_update().returning(|| Ok(4));
            stmt
        });

        let count = Update::new(source, "UPDATE books SET price = ? WHERE id = ?")
            .arg(1.0)
            .arg(2i64)
            .query_timeout(Duration::from_secs(3))
            .execute()
            .await
            .unwrap();

        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_execution_failure_propagates() {
        let source = source_with(|| {
            let mut stmt = MockStatement::new();
            stmt.expect_set_query_timeout().return_const(());
            stmt.expect_execute_update()
                .returning(|| Err(DriverError::Execute("constraint failed".to_string())));
            stmt
        });

        let result = Update::new(source, "UPDATE books SET price = ? WHERE id = ?")
            .execute()
            .await;

        assert!(matches!(result, Err(QueryError::ExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_mixed_shapes_rejected_before_acquire() {
        let mut source = MockSource::new();
        source.expect_acquire().never();

        let result = Update::new(Arc::new(source), "UPDATE books SET price = :price")
            .arg(1.0)
            .bind("price", 2.0)
            .execute()
            .await;

        assert!(matches!(result, Err(QueryError::ParameterShape(_))));
    }
}
