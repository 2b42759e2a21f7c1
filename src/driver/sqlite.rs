//! SQLite driver.
//!
//! Implements the driver traits on top of `rusqlite`. SQLite accepts the
//! `LIMIT <offset>,<count>` pagination grammar, so the default pagination
//! dialect runs unchanged.
//!
//! Calls into SQLite block, so statements run on tokio's blocking pool and
//! hand their rows back through a [`BufferedCursor`]. A statement with a
//! timeout installs a progress handler that interrupts it once the deadline
//! passes, which rolls the statement back and releases the connection.

use crate::config::{DataSourceConfig, DatabaseTarget, OpenMode};
use crate::driver::cursor::BufferedCursor;
use crate::driver::protocol::{ColumnInfo, Connection, DataSource, PreparedStatement, RowCursor};
use crate::error::{ConnectionError, DriverError};
use crate::types::Value;
use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, OpenFlags};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

type SharedConnection = Arc<Mutex<rusqlite::Connection>>;

/// Virtual machine instructions between deadline checks.
const PROGRESS_INTERVAL: i32 = 1000;

#[derive(Debug)]
enum Target {
    /// In-memory databases are private to one SQLite connection, so every
    /// checkout shares it.
    Shared(SharedConnection),
    /// File databases open a fresh SQLite connection per checkout.
    File { path: PathBuf, flags: OpenFlags },
}

/// A `DataSource` backed by SQLite.
///
/// # Example
///
/// ```no_run
/// use rowstream::driver::SqliteDataSource;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let data_source = SqliteDataSource::memory()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteDataSource {
    target: Target,
    busy_timeout: Duration,
}

impl SqliteDataSource {
    /// Open a data source described by `config`.
    ///
    /// File databases are opened once up front so that a bad path or mode
    /// fails here rather than on the first query.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::OpenFailed` if the database cannot be opened.
    pub fn open(config: &DataSourceConfig) -> Result<Self, ConnectionError> {
        let target = match &config.target {
            DatabaseTarget::Memory => {
                let conn = rusqlite::Connection::open_in_memory().map_err(|e| {
                    ConnectionError::OpenFailed {
                        target: config.target.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Target::Shared(Arc::new(Mutex::new(conn)))
            }
            DatabaseTarget::File(path) => {
                let flags = open_flags(config.mode);
                rusqlite::Connection::open_with_flags(path, flags).map_err(|e| {
                    ConnectionError::OpenFailed {
                        target: config.target.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Target::File {
                    path: path.clone(),
                    flags,
                }
            }
        };

        debug!(target = %config.target, "opened sqlite data source");

        Ok(Self {
            target,
            busy_timeout: config.busy_timeout,
        })
    }

    /// Open a private in-memory database.
    pub fn memory() -> Result<Self, ConnectionError> {
        Self::open(&DataSourceConfig::builder().memory().build()?)
    }
}

#[async_trait]
impl DataSource for SqliteDataSource {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        let conn = match &self.target {
            Target::Shared(conn) => Arc::clone(conn),
            Target::File { path, flags } => {
                let path = path.clone();
                let flags = *flags;
                let busy_timeout = self.busy_timeout;
                let conn = tokio::task::spawn_blocking(move || {
                    let conn = rusqlite::Connection::open_with_flags(&path, flags)
                        .map_err(|e| DriverError::Connect(e.to_string()))?;
                    conn.busy_timeout(busy_timeout)
                        .map_err(|e| DriverError::Connect(e.to_string()))?;
                    Ok::<_, DriverError>(conn)
                })
                .await
                .map_err(|e| DriverError::Connect(format!("Blocking task failed: {}", e)))??;
                Arc::new(Mutex::new(conn))
            }
        };

        Ok(Box::new(SqliteConnection { conn }))
    }
}

/// A checked-out SQLite connection.
pub struct SqliteConnection {
    conn: SharedConnection,
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>, DriverError> {
        // Compile once to surface syntax errors at prepare time
        {
            let conn = lock(&self.conn)?;
            conn.prepare(sql)
                .map_err(|e| DriverError::Prepare(e.to_string()))?;
        }

        Ok(Box::new(SqliteStatement {
            conn: Arc::clone(&self.conn),
            sql: sql.to_string(),
            parameters: Vec::new(),
            timeout: None,
        }))
    }
}

/// A prepared SQLite statement.
///
/// The timeout counts from the start of `execute_*`, time spent waiting for
/// the connection included.
pub struct SqliteStatement {
    conn: SharedConnection,
    sql: String,
    parameters: Vec<Option<Value>>,
    timeout: Option<Duration>,
}

impl SqliteStatement {
    fn bound_values(&self) -> Result<Vec<SqliteValue>, DriverError> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(i, param)| {
                param
                    .clone()
                    .map(to_sqlite)
                    .ok_or_else(|| DriverError::Bind {
                        position: i + 1,
                        message: format!("Parameter {} is not bound", i + 1),
                    })
            })
            .collect()
    }

    fn deadline(&self) -> Option<Deadline> {
        self.timeout.map(|limit| Deadline {
            at: Instant::now() + limit,
            limit,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    /// Map an interrupted statement onto `DriverError::Timeout`.
    fn map_error(
        deadline: Option<Deadline>,
        wrap: fn(String) -> DriverError,
    ) -> impl Fn(rusqlite::Error) -> DriverError {
        move |e: rusqlite::Error| match (deadline, &e) {
            (Some(deadline), rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::OperationInterrupted =>
            {
                DriverError::Timeout {
                    timeout_ms: deadline.limit.as_millis() as u64,
                }
            }
            _ => wrap(e.to_string()),
        }
    }
}

/// Run `work` with the deadline's progress handler installed.
fn with_deadline<T>(
    conn: &rusqlite::Connection,
    deadline: Option<Deadline>,
    work: impl FnOnce(&rusqlite::Connection) -> Result<T, DriverError>,
) -> Result<T, DriverError> {
    let Some(deadline) = deadline else {
        return work(conn);
    };

    let at = deadline.at;
    conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= at));
    let result = work(conn);
    conn.progress_handler(0, None::<fn() -> bool>);
    result
}

#[async_trait]
impl PreparedStatement for SqliteStatement {
    fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.filter(|t| !t.is_zero());
    }

    fn bind(&mut self, position: usize, value: Value) -> Result<(), DriverError> {
        if position == 0 {
            return Err(DriverError::Bind {
                position,
                message: "Parameter positions start at 1".to_string(),
            });
        }

        if position > self.parameters.len() {
            self.parameters.resize(position, None);
        }
        self.parameters[position - 1] = Some(value);
        Ok(())
    }

    async fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, DriverError> {
        let values = self.bound_values()?;
        let conn = Arc::clone(&self.conn);
        let sql = self.sql.clone();
        let deadline = self.deadline();

        let (columns, rows) = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            with_deadline(&conn, deadline, |conn| {
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| DriverError::Prepare(e.to_string()))?;

                let columns: Vec<ColumnInfo> = stmt
                    .column_names()
                    .into_iter()
                    .map(ColumnInfo::new)
                    .collect();
                let width = columns.len();

                let mut rows = stmt
                    .query(params_from_iter(values))
                    .map_err(Deadline::map_error(deadline, DriverError::Execute))?;

                let mut fetched = Vec::new();
                while let Some(row) = rows
                    .next()
                    .map_err(Deadline::map_error(deadline, DriverError::Fetch))?
                {
                    let mut values = Vec::with_capacity(width);
                    for i in 0..width {
                        let value = row
                            .get_ref(i)
                            .map_err(|e| DriverError::Fetch(e.to_string()))?;
                        values.push(from_sqlite(value));
                    }
                    fetched.push(values);
                }

                Ok((columns, fetched))
            })
        })
        .await
        .map_err(|e| DriverError::Execute(format!("Blocking task failed: {}", e)))??;

        Ok(Box::new(BufferedCursor::new(columns, rows)))
    }

    async fn execute_update(&mut self) -> Result<u64, DriverError> {
        let values = self.bound_values()?;
        let conn = Arc::clone(&self.conn);
        let sql = self.sql.clone();
        let deadline = self.deadline();

        let count = tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            with_deadline(&conn, deadline, |conn| {
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| DriverError::Prepare(e.to_string()))?;
                stmt.execute(params_from_iter(values))
                    .map_err(Deadline::map_error(deadline, DriverError::Execute))
            })
        })
        .await
        .map_err(|e| DriverError::Execute(format!("Blocking task failed: {}", e)))??;

        Ok(count as u64)
    }
}

fn lock(conn: &Mutex<rusqlite::Connection>) -> Result<MutexGuard<'_, rusqlite::Connection>, DriverError> {
    conn.lock()
        .map_err(|_| DriverError::Execute("SQLite connection lock poisoned".to_string()))
}

fn open_flags(mode: OpenMode) -> OpenFlags {
    let access = match mode {
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
        OpenMode::ReadWriteCreate => {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    };
    access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn to_sqlite(value: Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Boolean(b) => SqliteValue::Integer(b as i64),
        Value::Integer(i) => SqliteValue::Integer(i),
        Value::Float(f) => SqliteValue::Real(f),
        Value::Text(s) => SqliteValue::Text(s),
        Value::Blob(b) => SqliteValue::Blob(b),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
