//! JSON-backed structured records (people, research, publications, talks, news, gallery).
//!
//! The data files have no enforced schema. Fields are read defensively: a missing or non-string field reads as an empty
//! string, and a file may either be a flat array of records or an object grouping arrays of records under keys (e.g.
//! `people.json` with `directors`, `phd_students`, ...).
use std::path::Path;

use serde_json::{Map, Value};

use crate::errors::DataError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(Map<String, Value>);

impl Record {
    /// String value of `key`, trimmed. Empty when missing or not a string/number.
    pub fn str_field(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(Value::String(value)) => value.trim(),
            _ => "",
        }
    }

    /// Like [`Record::str_field`], but also accepts numbers (some files carry numeric ids or years).
    pub fn text_field(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::Number(number)) => number.to_string(),
            _ => self.str_field(key).to_string(),
        }
    }

    pub fn id(&self) -> String {
        self.text_field("id")
    }

    /// External link of the record, if it has a non-empty one.
    pub fn link(&self) -> Option<&str> {
        Some(self.str_field("link")).filter(|link| !link.is_empty())
    }
}

/// Flattens a parsed data file into its records. Non-object items are ignored.
pub fn records_from_value(value: Value) -> Option<Vec<Record>> {
    fn collect(items: Vec<Value>, records: &mut Vec<Record>) {
        records.extend(items.into_iter().filter_map(|item| match item {
            Value::Object(fields) => Some(Record(fields)),
            _ => None,
        }));
    }

    let mut records = vec![];
    match value {
        Value::Array(items) => collect(items, &mut records),
        Value::Object(groups) => {
            for (_, group) in groups {
                if let Value::Array(items) = group {
                    collect(items, &mut records);
                }
            }
        }
        _ => return None,
    }

    Some(records)
}

pub fn read_records(path: &Path) -> Result<Vec<Record>, DataError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    records_from_value(value).ok_or_else(|| DataError::Shape {
        path: path.to_path_buf(),
    })
}
