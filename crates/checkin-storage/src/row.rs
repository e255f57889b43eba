//! Untyped result rows.

use crate::error::{StorageError, StorageResult};
use crate::params::SqlValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

/// One result row: column names and values in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Convert a driver row, keeping each value's runtime storage class
    pub fn from_sqlite(row: &SqliteRow) -> StorageResult<Self> {
        let mut columns = Vec::with_capacity(row.len());

        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i)?;
            let value = if raw.is_null() {
                SqlValue::Null
            } else {
                match raw.type_info().name() {
                    "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get(i)?),
                    "REAL" => SqlValue::Real(row.try_get(i)?),
                    "BLOB" => SqlValue::Blob(row.try_get(i)?),
                    _ => row
                        .try_get::<String, _>(i)
                        .map(SqlValue::Text)
                        .or_else(|_| row.try_get::<i64, _>(i).map(SqlValue::Integer))?,
                }
            };
            columns.push((column.name().to_string(), value));
        }

        Ok(Self { columns })
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> StorageResult<i64> {
        self.get(column)
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| decode_error(column, "expected an integer"))
    }

    pub fn get_text(&self, column: &str) -> StorageResult<String> {
        self.get(column)
            .and_then(SqlValue::as_text)
            .ok_or_else(|| decode_error(column, "expected text"))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn decode_error(column: &str, reason: &str) -> StorageError {
    StorageError::Decode {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::new(vec![
            ("user_id".to_string(), SqlValue::Integer(4)),
            ("user_name".to_string(), SqlValue::Text("Aiko".to_string())),
            ("check_time".to_string(), SqlValue::Text("260314093015".to_string())),
        ])
    }

    #[test]
    fn test_typed_getters() {
        let row = sample();
        assert_eq!(row.get_i64("user_id").unwrap(), 4);
        assert_eq!(row.get_text("user_name").unwrap(), "Aiko");
        assert_eq!(row.get_i64("check_time").unwrap(), 260314093015);
        assert_eq!(row.get_text("user_id").unwrap(), "4");
    }

    #[test]
    fn test_missing_column_is_decode_error() {
        let err = sample().get_i64("nope").unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
    }

    #[test]
    fn test_serializes_in_column_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"user_id":4,"user_name":"Aiko","check_time":"260314093015"}"#
        );
    }
}
