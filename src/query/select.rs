//! Fluent SELECT queries.

use crate::driver::DataSource;
use crate::error::QueryError;
use crate::query::cursor::WindowCursor;
use crate::query::parameters::{ParameterSlot, Parameters};
use crate::query::results::Row;
use crate::query::statement::{LimitOffset, OrderBy, Pagination, StatementType, Window};
use crate::query::subscriber::{Subscriber, Subscription};
use crate::types::Value;
use futures_util::stream::{self, Stream, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A configured SELECT query.
///
/// Configuration methods consume and return the query. Executing never
/// changes the configuration: every execution works on its own snapshot, so
/// one query can run any number of times, concurrently included.
///
/// By default only the first row is fetched (`LIMIT 0,1`). Use
/// [`Query::limit`] to pick a window and [`Query::all_rows`] to keep
/// fetching windows until a short one comes back.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use rowstream::query::OrderBy;
/// use rowstream::Sql;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sql = Sql::connect("sqlite::memory:")?;
///
/// let query = sql
///     .query("SELECT title, year FROM books WHERE author = :author")
///     .bind("author", "Herbert")
///     .order_by(OrderBy::desc("year"))
///     .limit(0, 50)
///     .all_rows(true);
///
/// let mut rows = Box::pin(query.execute());
/// while let Some(row) = rows.next().await {
///     let row = row?;
///     println!("{:?}", row.get_by_name("title")?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Query {
    pub(crate) data_source: Arc<dyn DataSource>,
    pub(crate) sql: String,
    pub(crate) all_rows: bool,
    pub(crate) window: Window,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) parameters: ParameterSlot,
    pub(crate) timeout: Option<Duration>,
    pub(crate) pagination: Arc<dyn Pagination>,
}

impl Query {
    /// Create a query over `data_source`.
    pub fn new(data_source: Arc<dyn DataSource>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        if !StatementType::from_sql(&sql).returns_result_set() {
            warn!(sql = %sql, "query text does not look like a SELECT");
        }

        Self {
            data_source,
            sql,
            all_rows: false,
            window: Window::default(),
            order_by: Vec::new(),
            parameters: ParameterSlot::default(),
            timeout: None,
            pagination: Arc::new(LimitOffset),
        }
    }

    /// Keep fetching windows until one returns fewer rows than requested.
    pub fn all_rows(mut self, enabled: bool) -> Self {
        self.all_rows = enabled;
        self
    }

    /// Set the first window: skip `offset` rows, fetch `count` per window.
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.window = Window::new(offset, count);
        self
    }

    /// Append an ORDER BY entry.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Bind a named parameter.
    ///
    /// Mixing this with [`Query::arg`] is reported as
    /// `QueryError::ParameterShape` when the query runs.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Append a positional parameter.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value);
        self
    }

    /// Replace all parameters. Accepts `Parameters`, a `Row`, a value map or
    /// a value list.
    pub fn parameters(mut self, parameters: impl Into<Parameters>) -> Self {
        self.parameters.replace(parameters.into());
        self
    }

    /// Limit each statement execution. Zero means unlimited.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Use another pagination dialect.
    pub fn pagination(mut self, pagination: impl Pagination + 'static) -> Self {
        self.pagination = Arc::new(pagination);
        self
    }

    /// Base SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// First window.
    pub fn window(&self) -> Window {
        self.window
    }

    pub fn is_all_rows(&self) -> bool {
        self.all_rows
    }

    pub fn order(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Configured parameters.
    pub fn params(&self) -> &Parameters {
        self.parameters.parameters()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Check the configuration before anything is executed.
    pub(crate) fn validate(&self) -> Result<&Parameters, QueryError> {
        if self.all_rows && self.window.count == 0 {
            return Err(QueryError::InvalidWindow(
                "All-rows mode needs a window count of at least 1".to_string(),
            ));
        }
        self.parameters.resolve()
    }

    /// Execute and stream rows.
    ///
    /// The stream ends after the last row or after the first error. Dropping
    /// it cancels the execution; no further window is fetched.
    pub fn execute(&self) -> impl Stream<Item = Result<Row, QueryError>> + Send + 'static {
        stream::unfold(WindowCursor::new(self.clone()), |mut cursor| async move {
            cursor.next().await.map(|item| (item, cursor))
        })
    }

    /// Execute and collect every row.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the execution.
    pub async fn fetch_all(&self) -> Result<Vec<Row>, QueryError> {
        self.execute().try_collect().await
    }

    /// Execute and push rows to `subscriber`.
    ///
    /// The subscriber gets its [`Subscription`] first. Cancellation is checked
    /// before every row and before every window; once it is seen nothing else
    /// is delivered. Otherwise the execution ends with exactly one of
    /// `on_error` or `on_complete`.
    pub async fn subscribe<S: Subscriber + ?Sized>(&self, subscriber: &mut S) {
        let subscription = Subscription::new();
        subscriber.on_subscribe(subscription.clone());

        let mut cursor = WindowCursor::new(self.clone());
        loop {
            if subscription.is_cancelled() {
                debug!(sql = %self.sql, window = %cursor.window(), "subscription cancelled");
                return;
            }

            match cursor.next().await {
                Some(Ok(row)) => subscriber.on_next(row),
                Some(Err(e)) => {
                    subscriber.on_error(e);
                    return;
                }
                None => {
                    subscriber.on_complete();
                    return;
                }
            }
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("all_rows", &self.all_rows)
            .field("window", &self.window)
            .field("order_by", &self.order_by)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}
