//! In-memory row cursor.

use crate::driver::protocol::{ColumnInfo, RowCursor};
use crate::error::DriverError;
use crate::types::Value;
use async_trait::async_trait;
use std::collections::VecDeque;

/// A `RowCursor` over rows that were already fetched.
///
/// Drivers whose native cursor cannot outlive a blocking call hand their rows
/// over through this type.
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Vec<Value>>,
}

impl BufferedCursor {
    /// Create a cursor over `rows`, each laid out in `columns` order.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }
}

#[async_trait]
impl RowCursor for BufferedCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError> {
        Ok(self.rows.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffered_cursor_yields_in_order() {
        let mut cursor = BufferedCursor::new(
            vec![ColumnInfo::new("id")],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );

        assert_eq!(cursor.columns().len(), 1);
        assert_eq!(
            cursor.next_row().await.unwrap(),
            Some(vec![Value::Integer(1)])
        );
        assert_eq!(
            cursor.next_row().await.unwrap(),
            Some(vec![Value::Integer(2)])
        );
        assert_eq!(cursor.next_row().await.unwrap(), None);
    }
}
