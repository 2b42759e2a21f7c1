//! Common test utilities for rowstream integration tests.
//!
//! Tests run against private in-memory SQLite databases, so no external
//! service is needed. The data source is wrapped in a [`RecordingDataSource`]
//! that counts connection checkouts and records every prepared statement, so
//! tests can observe how many windows an execution issued.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration_tests
//!
//! # With engine logging
//! RUST_LOG=rowstream=debug cargo test --test integration_tests -- --nocapture
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use rowstream::driver::{Connection, DataSource, PreparedStatement, SqliteDataSource};
use rowstream::{DriverError, QueryError, Row, Sql, Subscriber, Subscription};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

/// Number of rows in the seeded `numbers` table.
pub const NUMBER_ROWS: i64 = 25;

static TRACING: Once = Once::new();

/// Install a tracing subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Recording data source
// ============================================================================

/// Data source wrapper that records checkouts and prepared SQL.
pub struct RecordingDataSource {
    inner: SqliteDataSource,
    acquired: AtomicUsize,
    prepared: Arc<Mutex<Vec<String>>>,
}

impl RecordingDataSource {
    pub fn new(inner: SqliteDataSource) -> Self {
        Self {
            inner,
            acquired: AtomicUsize::new(0),
            prepared: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connections checked out since the last reset.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Statement text prepared since the last reset, in order.
    pub fn prepared(&self) -> Vec<String> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.acquired.store(0, Ordering::SeqCst);
        self.prepared.lock().unwrap().clear();
    }
}

#[async_trait]
impl DataSource for RecordingDataSource {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DriverError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.acquire().await?;
        Ok(Box::new(RecordingConnection {
            inner,
            prepared: Arc::clone(&self.prepared),
        }))
    }
}

struct RecordingConnection {
    inner: Box<dyn Connection>,
    prepared: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn PreparedStatement>, DriverError> {
        self.prepared.lock().unwrap().push(sql.to_string());
        self.inner.prepare(sql).await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A fresh database holding `numbers (n INTEGER PRIMARY KEY, label TEXT)`
/// with `n` in `0..count` and `label` = `'n<n>'`.
pub async fn numbers(count: i64) -> (Sql, Arc<RecordingDataSource>) {
    init_tracing();

    let source = Arc::new(RecordingDataSource::new(
        SqliteDataSource::memory().expect("open in-memory database"),
    ));
    let sql = Sql::new(source.clone());

    let mut statements = vec!["CREATE TABLE numbers (n INTEGER PRIMARY KEY, label TEXT)".to_string()];
    statements.extend((0..count).map(|n| format!("INSERT INTO numbers VALUES ({}, 'n{}')", n, n)));
    sql.batch(statements).execute().await.expect("seed numbers");

    source.reset();
    (sql, source)
}

/// Column `n` of each row.
pub fn ns(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| {
            row.get_by_name_as::<i64>("n")
                .expect("n is an integer")
                .expect("n is not null")
        })
        .collect()
}

// ============================================================================
// Subscribers
// ============================================================================

/// Subscriber that records every signal and can cancel after N rows.
#[derive(Default)]
pub struct Recorder {
    pub subscription: Option<Subscription>,
    pub cancel_after: Option<usize>,
    pub rows: Vec<Row>,
    pub errors: Vec<QueryError>,
    pub completed: usize,
}

impl Recorder {
    pub fn cancelling_after(n: usize) -> Self {
        Self {
            cancel_after: Some(n),
            ..Default::default()
        }
    }

    /// Total terminal signals received.
    pub fn terminal_signals(&self) -> usize {
        self.errors.len() + self.completed
    }
}

impl Subscriber for Recorder {
    fn on_subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
    }

    fn on_next(&mut self, row: Row) {
        self.rows.push(row);
        if Some(self.rows.len()) == self.cancel_after {
            if let Some(subscription) = &self.subscription {
                subscription.cancel();
            }
        }
    }

    fn on_error(&mut self, error: QueryError) {
        self.errors.push(error);
    }

    fn on_complete(&mut self) {
        self.completed += 1;
    }
}
