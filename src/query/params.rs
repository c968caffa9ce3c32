//! Named parameters handed to the event store with the rendered SQL.

use serde::Serialize;

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Text(String),
    Long(i64),
    Longs(Vec<i64>),
}

impl ParamValue {
    pub fn longs_or_null(values: Vec<i64>) -> Self {
        if values.is_empty() {
            Self::Null
        } else {
            Self::Longs(values)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rendered statement plus the parameters it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: QueryParams,
}

impl BuiltQuery {
    pub fn new(sql: String) -> Self {
        Self {
            sql,
            params: QueryParams::new(),
        }
    }

    pub fn with_params(sql: String, params: QueryParams) -> Self {
        Self { sql, params }
    }

    /// Names referenced as `:name` in the SQL text, in order of first appearance.
    pub fn referenced_params(&self) -> Vec<String> {
        let mut out = Vec::<String>::new();
        let bytes = self.sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b':' && (i == 0 || bytes[i - 1] != b':') {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start && !bytes[start].is_ascii_digit() {
                    let name = &self.sql[start..end];
                    if !out.iter().any(|n| n == name) {
                        out.push(name.to_string());
                    }
                }
                i = end.max(i + 1);
            } else {
                i += 1;
            }
        }
        out
    }
}
