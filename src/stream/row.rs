//! Untyped rows as delivered by an event store.

use std::collections::BTreeMap;

use crate::{ProfError, ProfResult};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
    Json(serde_json::Value),
}

impl SqlValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row keyed by column label. A missing column reads the same as `NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        match self.columns.get(column) {
            Some(SqlValue::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn i64(&self, column: &str) -> ProfResult<Option<i64>> {
        match self.get(column) {
            None => Ok(None),
            Some(SqlValue::Int(v)) => Ok(Some(*v)),
            Some(SqlValue::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| mismatch(column, "an integer", s)),
            Some(SqlValue::Json(serde_json::Value::Number(n))) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| mismatch(column, "an integer", &n.to_string())),
            Some(other) => Err(mismatch(column, "an integer", other.kind())),
        }
    }

    /// Non-negative integer; `NULL` reads as zero.
    pub fn u64_or_zero(&self, column: &str) -> ProfResult<u64> {
        match self.i64(column)? {
            None => Ok(0),
            Some(v) => u64::try_from(v)
                .map_err(|_| ProfError::DataMapping(format!("column {column} is negative: {v}"))),
        }
    }

    pub fn bool(&self, column: &str) -> ProfResult<Option<bool>> {
        match self.get(column) {
            None => Ok(None),
            Some(SqlValue::Bool(b)) => Ok(Some(*b)),
            Some(SqlValue::Int(v)) => Ok(Some(*v != 0)),
            Some(SqlValue::Json(serde_json::Value::Bool(b))) => Ok(Some(*b)),
            Some(other) => Err(mismatch(column, "a boolean", other.kind())),
        }
    }

    pub fn text(&self, column: &str) -> ProfResult<Option<&str>> {
        match self.get(column) {
            None => Ok(None),
            Some(SqlValue::Text(s)) => Ok(Some(s)),
            Some(SqlValue::Json(serde_json::Value::String(s))) => Ok(Some(s)),
            Some(other) => Err(mismatch(column, "text", other.kind())),
        }
    }

    pub fn require_text(&self, column: &str) -> ProfResult<&str> {
        self.text(column)?
            .ok_or_else(|| ProfError::DataMapping(format!("required column {column} is missing")))
    }

    /// JSON value stored either natively or as JSON text.
    pub fn json(&self, column: &str) -> ProfResult<Option<serde_json::Value>> {
        match self.get(column) {
            None => Ok(None),
            Some(SqlValue::Json(value)) => Ok(Some(value.clone())),
            Some(SqlValue::Text(s)) => serde_json::from_str(s).map(Some).map_err(|err| {
                ProfError::DataMapping(format!("column {column} holds malformed JSON: {err}"))
            }),
            Some(other) => Err(mismatch(column, "JSON", other.kind())),
        }
    }

    /// List of integers stored as a JSON array (native or text).
    pub fn i64_list(&self, column: &str) -> ProfResult<Option<Vec<i64>>> {
        let Some(value) = self.json(column)? else {
            return Ok(None);
        };
        let serde_json::Value::Array(items) = value else {
            return Err(mismatch(column, "an integer list", "non-array JSON"));
        };
        items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| mismatch(column, "an integer list", &item.to_string()))
            })
            .collect::<ProfResult<Vec<_>>>()
            .map(Some)
    }
}

impl<S: Into<String>> FromIterator<(S, SqlValue)> for Row {
    fn from_iter<T: IntoIterator<Item = (S, SqlValue)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &str) -> ProfError {
    ProfError::DataMapping(format!("column {column}: expected {expected}, found {found}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_missing_columns_read_as_absent() {
        let row = Row::new().with("a", SqlValue::Null);
        assert_eq!(row.i64("a").expect("a"), None);
        assert_eq!(row.i64("b").expect("b"), None);
        assert_eq!(row.u64_or_zero("a").expect("a"), 0);
        assert!(row.require_text("a").is_err());
    }

    #[test]
    fn negative_counters_are_rejected() {
        let row = Row::new().with("samples", -1i64);
        assert!(matches!(
            row.u64_or_zero("samples"),
            Err(ProfError::DataMapping(_))
        ));
    }

    #[test]
    fn json_text_is_parsed_and_malformed_text_fails() {
        let row = Row::new()
            .with("ok", "{\"gcId\": 4}")
            .with("bad", "{not json");
        assert_eq!(
            row.json("ok").expect("ok"),
            Some(serde_json::json!({"gcId": 4}))
        );
        assert!(matches!(row.json("bad"), Err(ProfError::DataMapping(_))));
    }

    #[test]
    fn integer_lists_accept_native_and_text_json() {
        let row = Row::new()
            .with("native", serde_json::json!([3, 2, 1]))
            .with("text", "[5]")
            .with("mixed", "[1, \"x\"]");
        assert_eq!(row.i64_list("native").expect("native"), Some(vec![3, 2, 1]));
        assert_eq!(row.i64_list("text").expect("text"), Some(vec![5]));
        assert!(row.i64_list("mixed").is_err());
    }
}
