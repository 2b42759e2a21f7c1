//! Windowed query execution.
//!
//! A [`WindowCursor`] runs one execution of a [`Query`]. Each window checks
//! out a connection, prepares the paginated statement, binds parameters and
//! executes it; rows are then handed out one per call to
//! [`WindowCursor::next`]. When a window is drained the cursor either ends or,
//! in all-rows mode, moves to the next window. A window that returns fewer
//! rows than requested is the last one.
//!
//! The connection, statement and row cursor of a window are released as soon
//! as the window ends, whether it drained, failed or the cursor was dropped.

use crate::driver::{Connection, PreparedStatement, RowCursor};
use crate::error::QueryError;
use crate::query::parameters;
use crate::query::results::Row;
use crate::query::run_with_timeout;
use crate::query::select::Query;
use crate::query::statement::{StatementBuilder, Window};
use tracing::debug;

enum State {
    /// Between windows
    Idle,
    /// Draining the rows of the current window
    Fetching {
        // Field order is drop order: cursor, then statement, then connection
        rows: Box<dyn RowCursor>,
        _statement: Box<dyn PreparedStatement>,
        _connection: Box<dyn Connection>,
        fetched: u64,
    },
    /// Exhausted or failed
    Done,
}

/// Pull-driven state machine over the windows of one query execution.
///
/// The cursor owns a snapshot of the query taken when it was created, so
/// the query can be reconfigured or executed again without affecting it.
pub struct WindowCursor {
    query: Query,
    window: Window,
    windows_opened: u64,
    state: State,
}

impl WindowCursor {
    pub fn new(query: Query) -> Self {
        let window = query.window;
        Self {
            query,
            window,
            windows_opened: 0,
            state: State::Idle,
        }
    }

    /// The window that is being fetched, or will be fetched next.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Number of windows executed so far.
    pub fn windows_opened(&self) -> u64 {
        self.windows_opened
    }

    /// Fetch the next row.
    ///
    /// Returns `None` once the query is exhausted. An error is returned once,
    /// after which the cursor is exhausted.
    pub async fn next(&mut self) -> Option<Result<Row, QueryError>> {
        loop {
            match &mut self.state {
                State::Done => return None,
                State::Idle => match self.open_window().await {
                    Ok(state) => self.state = state,
                    Err(e) => {
                        self.state = State::Done;
                        return Some(Err(e));
                    }
                },
                State::Fetching { rows, fetched, .. } => match rows.next_row().await {
                    Ok(Some(values)) => {
                        *fetched += 1;
                        return Some(Ok(Row::materialize(rows.columns(), values)));
                    }
                    Ok(None) => {
                        let fetched = *fetched;
                        self.finish_window(fetched);
                    }
                    Err(e) => {
                        self.state = State::Done;
                        return Some(Err(e.into()));
                    }
                },
            }
        }
    }

    async fn open_window(&mut self) -> Result<State, QueryError> {
        let query = &self.query;
        let parameters = query.validate()?;

        let (sql, ordinals) = StatementBuilder::new(&query.sql)
            .order_by(&query.order_by)
            .paginate(self.window, query.pagination.as_ref())
            .build();

        debug!(
            sql = %sql,
            window = %self.window,
            parameters = %parameters,
            "executing query window"
        );

        let mut connection = query.data_source.acquire().await?;
        let mut statement = connection.prepare(&sql).await?;
        statement.set_query_timeout(query.timeout);
        parameters::bind(statement.as_mut(), parameters, &ordinals)?;
        let rows = run_with_timeout(query.timeout, statement.execute_query()).await?;

        self.windows_opened += 1;

        Ok(State::Fetching {
            rows,
            _statement: statement,
            _connection: connection,
            fetched: 0,
        })
    }

    fn finish_window(&mut self, fetched: u64) {
        if !self.query.all_rows {
            self.state = State::Done;
        } else if fetched < self.window.count {
            debug!(window = %self.window, fetched, "short window, no further rows");
            self.state = State::Done;
        } else {
            self.window = self.window.next();
            self.state = State::Idle;
        }
    }
}
