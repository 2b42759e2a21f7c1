//! SQL statement composition.
//!
//! This module appends ordering and pagination clauses to base SQL text
//! and hands the result to the placeholder rewriter. Identifiers are trusted
//! literal text; nothing here escapes them.

use crate::query::parameters::{rewrite, OrdinalMap};
use std::fmt;

/// Type of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// DDL statement (CREATE, ALTER, DROP)
    Ddl,
    /// Unknown or other statement type
    Other,
}

impl StatementType {
    /// Detect statement type from SQL text.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start().to_uppercase();

        if trimmed.starts_with("SELECT") || trimmed.starts_with("WITH") {
            Self::Select
        } else if trimmed.starts_with("INSERT") || trimmed.starts_with("REPLACE") {
            Self::Insert
        } else if trimmed.starts_with("UPDATE") {
            Self::Update
        } else if trimmed.starts_with("DELETE") {
            Self::Delete
        } else if trimmed.starts_with("CREATE")
            || trimmed.starts_with("ALTER")
            || trimmed.starts_with("DROP")
        {
            Self::Ddl
        } else {
            Self::Other
        }
    }

    /// Check if this statement type returns a result set.
    pub fn returns_result_set(&self) -> bool {
        matches!(self, Self::Select)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "ASC"),
            Direction::Descending => write!(f, "DESC"),
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Ascending)
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, Direction::Descending)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// Pagination cursor: starting offset and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub count: u64,
}

impl Default for Window {
    /// First row only.
    fn default() -> Self {
        Self {
            offset: 0,
            count: 1,
        }
    }
}

impl Window {
    pub fn new(offset: u64, count: u64) -> Self {
        Self { offset, count }
    }

    /// The window directly after this one.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.count),
            count: self.count,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.offset, self.count)
    }
}

/// Renders the pagination clause for a window.
pub trait Pagination: Send + Sync + fmt::Debug {
    fn render(&self, window: Window) -> String;
}

/// `LIMIT <offset>,<count>`, as understood by MySQL and SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitOffset;

impl Pagination for LimitOffset {
    fn render(&self, window: Window) -> String {
        format!("LIMIT {},{}", window.offset, window.count)
    }
}

/// `OFFSET <offset> ROWS FETCH NEXT <count> ROWS ONLY`, the SQL:2008 form.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetFetch;

impl Pagination for OffsetFetch {
    fn render(&self, window: Window) -> String {
        format!(
            "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            window.offset, window.count
        )
    }
}

/// Composes final statement text.
///
/// # Example
///
/// ```
/// use rowstream::query::{LimitOffset, OrderBy, StatementBuilder, Window};
///
/// let order = [OrderBy::desc("year"), OrderBy::asc("title")];
/// let (sql, ordinals) = StatementBuilder::new("SELECT * FROM books WHERE author = :author")
///     .order_by(&order)
///     .paginate(Window::new(20, 10), &LimitOffset)
///     .build();
///
/// assert_eq!(
///     sql,
///     "SELECT * FROM books WHERE author = ? ORDER BY year DESC, title ASC LIMIT 20,10"
/// );
/// assert_eq!(ordinals["author"], 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder<'a> {
    sql: &'a str,
    order_by: &'a [OrderBy],
    page: Option<(Window, &'a dyn Pagination)>,
}

impl<'a> StatementBuilder<'a> {
    /// Create a new statement builder.
    pub fn new(sql: &'a str) -> Self {
        Self {
            sql,
            order_by: &[],
            page: None,
        }
    }

    /// Set the ordering. An empty slice adds no ORDER BY clause.
    pub fn order_by(mut self, order_by: &'a [OrderBy]) -> Self {
        self.order_by = order_by;
        self
    }

    /// Restrict to `window`, rendered by `pagination`.
    pub fn paginate(mut self, window: Window, pagination: &'a dyn Pagination) -> Self {
        self.page = Some((window, pagination));
        self
    }

    /// Statement text with ORDER BY and pagination, before rewriting.
    pub fn sql(&self) -> String {
        let mut sql = self.sql.to_string();

        if !self.order_by.is_empty() {
            let order: Vec<String> = self.order_by.iter().map(ToString::to_string).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some((window, pagination)) = self.page {
            sql.push(' ');
            sql.push_str(&pagination.render(window));
        }

        sql
    }

    /// Compose the text and rewrite its placeholders.
    pub fn build(&self) -> (String, OrdinalMap) {
        rewrite(&self.sql())
    }
}
