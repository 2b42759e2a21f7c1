//! Materialized result rows.
//!
//! A [`Row`] is an ordered name to value record. Ordinals are fixed when the
//! row is built: the first distinct name is ordinal 1, the next is 2, and so
//! on. [`Row::with_changes`] derives a copy with pending changes laid over it.

use crate::driver::ColumnInfo;
use crate::error::RowError;
use crate::query::parameters::Parameters;
use crate::types::{FromValue, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// One materialized result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Names in insertion order; the first `ordinal_count` carry ordinals
    names: Vec<String>,
    values: HashMap<String, Value>,
    ordinal_count: usize,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(name, value)` pairs in column order.
    ///
    /// A repeated name keeps the ordinal of its first occurrence and the
    /// value of its last.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.put(name.into(), value.into());
        }
        row.ordinal_count = row.names.len();
        row
    }

    /// Materialize one fetched row.
    ///
    /// Each column is keyed by its label when the driver reports one,
    /// otherwise by its name.
    pub fn materialize(columns: &[ColumnInfo], values: Vec<Value>) -> Self {
        Self::from_pairs(
            columns
                .iter()
                .map(|column| column.identifier().to_string())
                .zip(values),
        )
    }

    fn put(&mut self, name: String, value: Value) {
        if self.values.insert(name.clone(), value).is_none() {
            self.names.push(name);
        }
    }

    /// Get a value by 1-based ordinal.
    ///
    /// # Errors
    ///
    /// Returns `RowError::OrdinalOutOfRange` outside `1..=len()`.
    pub fn get(&self, ordinal: usize) -> Result<&Value, RowError> {
        let name = self.name_at(ordinal)?;
        self.get_by_name(name)
    }

    /// Get a value by column name.
    ///
    /// # Errors
    ///
    /// Returns `RowError::UnknownColumn` if no column has that name.
    pub fn get_by_name(&self, name: &str) -> Result<&Value, RowError> {
        self.values
            .get(name)
            .ok_or_else(|| RowError::UnknownColumn(name.to_string()))
    }

    /// Get a typed value by 1-based ordinal. `NULL` reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `RowError::TypeMismatch` if the stored value has another type.
    pub fn get_as<T: FromValue>(&self, ordinal: usize) -> Result<Option<T>, RowError> {
        let name = self.name_at(ordinal)?;
        self.get_by_name_as(name)
    }

    /// Get a typed value by column name. `NULL` reads as `None`.
    pub fn get_by_name_as<T: FromValue>(&self, name: &str) -> Result<Option<T>, RowError> {
        let value = self.get_by_name(name)?;
        if value.is_null() {
            return Ok(None);
        }

        T::from_value(value)
            .map(Some)
            .ok_or_else(|| RowError::TypeMismatch {
                column: name.to_string(),
                expected: T::TYPE_NAME,
                actual: value.type_name(),
            })
    }

    fn name_at(&self, ordinal: usize) -> Result<&str, RowError> {
        if ordinal == 0 || ordinal > self.ordinal_count {
            return Err(RowError::OrdinalOutOfRange {
                ordinal,
                len: self.ordinal_count,
            });
        }
        Ok(&self.names[ordinal - 1])
    }

    /// Ordinal of a column, if it has one.
    pub fn ordinal_of(&self, name: &str) -> Option<usize> {
        self.columns()
            .iter()
            .position(|n| n == name)
            .map(|i| i + 1)
    }

    /// Check whether a name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of columns with an ordinal.
    pub fn len(&self) -> usize {
        self.ordinal_count
    }

    /// Check whether the row has no ordinal columns.
    ///
    /// Names added through [`with_changes`](Self::with_changes) have no
    /// ordinal and do not count.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in ordinal order.
    pub fn columns(&self) -> &[String] {
        &self.names[..self.ordinal_count]
    }

    /// Export every name and value, pending changes included.
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.values.clone()
    }

    /// Derive a copy with `changes` applied.
    ///
    /// Existing names keep their ordinal. New names are readable by name but
    /// get no ordinal. The original row is left untouched.
    pub fn with_changes<I, K, V>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = self.clone();
        for (name, value) in changes {
            row.put(name.into(), value.into());
        }
        row
    }

    /// Iterate over `(name, value)` pairs, ordinal columns first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.names
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.as_str(), v)))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl From<&Row> for Parameters {
    fn from(row: &Row) -> Self {
        Parameters::Named(row.to_map())
    }
}

impl From<Row> for Parameters {
    fn from(row: Row) -> Self {
        Parameters::Named(row.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Row {
        Row::from_pairs([
            ("id", Value::Integer(7)),
            ("title", Value::from("Dune")),
            ("price", Value::Null),
        ])
    }

    #[test]
    fn test_ordinals_are_dense_from_one() {
        let row = book();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get(1).unwrap(), &Value::Integer(7));
        assert_eq!(row.get(2).unwrap(), &Value::from("Dune"));
        assert_eq!(row.columns(), ["id", "title", "price"]);
        assert_eq!(row.ordinal_of("price"), Some(3));
    }

    #[test]
    fn test_ordinal_out_of_range() {
        let row = book();

        assert_eq!(
            row.get(0),
            Err(RowError::OrdinalOutOfRange { ordinal: 0, len: 3 })
        );
        assert_eq!(
            row.get(4),
            Err(RowError::OrdinalOutOfRange { ordinal: 4, len: 3 })
        );
    }

    #[test]
    fn test_unknown_name() {
        let row = book();

        assert!(!row.contains("author"));
        assert_eq!(
            row.get_by_name("author"),
            Err(RowError::UnknownColumn("author".to_string()))
        );
    }

    #[test]
    fn test_typed_access() {
        let row = book();

        assert_eq!(row.get_as::<i64>(1).unwrap(), Some(7));
        assert_eq!(
            row.get_by_name_as::<String>("title").unwrap(),
            Some("Dune".to_string())
        );
        assert_eq!(row.get_by_name_as::<f64>("price").unwrap(), None);

        let err = row.get_as::<String>(1).unwrap_err();
        assert_eq!(
            err,
            RowError::TypeMismatch {
                column: "id".to_string(),
                expected: "TEXT",
                actual: "INTEGER",
            }
        );
    }

    #[test]
    fn test_repeated_name_keeps_first_ordinal() {
        let row = Row::from_pairs([("id", 1i64), ("name", 2), ("id", 3)]);

        assert_eq!(row.len(), 2);
        assert_eq!(row.ordinal_of("id"), Some(1));
        assert_eq!(row.get(1).unwrap(), &Value::Integer(3));
    }

    #[test]
    fn test_materialize_prefers_label() {
        let columns = vec![
            ColumnInfo::new("id"),
            ColumnInfo::new("title").with_label("headline"),
        ];
        let row = Row::materialize(&columns, vec![Value::Integer(1), Value::from("Dune")]);

        assert!(row.contains("headline"));
        assert!(!row.contains("title"));
        assert_eq!(row.get(2).unwrap(), &Value::from("Dune"));
    }

    #[test]
    fn test_with_changes_leaves_original() {
        let row = book();
        let changed = row.with_changes([("price", Value::Float(9.5)), ("stock", Value::Integer(3))]);

        assert_eq!(row.get_by_name("price").unwrap(), &Value::Null);
        assert!(!row.contains("stock"));

        assert_eq!(changed.get(3).unwrap(), &Value::Float(9.5));
        assert_eq!(changed.get_by_name("stock").unwrap(), &Value::Integer(3));
        assert_eq!(changed.ordinal_of("stock"), None);
        assert_eq!(changed.len(), 3);
        assert_eq!(changed.to_map().len(), 4);
    }

    #[test]
    fn test_is_empty_ignores_unordered_names() {
        let row = Row::new().with_changes([("note", "draft")]);

        assert_eq!(row.len(), 0);
        assert!(row.is_empty());
        assert!(row.contains("note"));
        assert!(!book().is_empty());
    }

    #[test]
    fn test_row_as_parameters() {
        let params = Parameters::from(&book());

        assert_eq!(params.get("title"), Some(&Value::from("Dune")));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_serialize_in_column_order() {
        let json = serde_json::to_string(&book()).unwrap();
        assert_eq!(json, r#"{"id":7,"title":"Dune","price":null}"#);
    }
}
