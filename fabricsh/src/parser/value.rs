//! Dynamically shaped values produced by the response parser.

use indexmap::IndexMap;
use serde::Serialize;

/// Keyed record produced by parsing one response. Keys keep insertion order.
pub type Record = IndexMap<String, Value>;

/// A parsed field.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<Value>),
    Map(Record),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integers, or text holding an integer (switchshow prints numbers as text).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// List of text items as owned strings; non-text items are skipped.
    pub fn to_string_list(&self) -> Vec<String> {
        self.as_list()
            .map(|l| {
                l.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Map(value)
    }
}

/// Get or create the map stored under `key`.
///
/// A non-map value already stored under `key` is replaced.
pub(crate) fn map_entry<'a>(record: &'a mut Record, key: &str) -> &'a mut Record {
    let slot = record
        .entry(key.to_string())
        .or_insert_with(|| Value::Map(Record::new()));
    if !matches!(slot, Value::Map(_)) {
        *slot = Value::Map(Record::new());
    }
    match slot {
        Value::Map(m) => m,
        _ => unreachable!("slot was just set to a map"),
    }
}

/// Get or create the list stored under `key`.
pub(crate) fn list_entry<'a>(record: &'a mut Record, key: &str) -> &'a mut Vec<Value> {
    let slot = record
        .entry(key.to_string())
        .or_insert_with(|| Value::List(Vec::new()));
    if !matches!(slot, Value::List(_)) {
        *slot = Value::List(Vec::new());
    }
    match slot {
        Value::List(l) => l,
        _ => unreachable!("slot was just set to a list"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_created_once() {
        let mut record = Record::new();
        map_entry(&mut record, "defined_configuration").insert("cfg".into(), Value::Null);
        map_entry(&mut record, "defined_configuration");
        assert_eq!(record["defined_configuration"].as_map().unwrap().len(), 1);

        list_entry(&mut record, "ports").push(Value::Int(1));
        list_entry(&mut record, "ports").push(Value::Int(2));
        assert_eq!(record["ports"].as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_as_int_reads_text() {
        assert_eq!(Value::text(" 12 ").as_int(), Some(12));
        assert_eq!(Value::Int(3).as_int(), Some(3));
        assert_eq!(Value::text("x").as_int(), None);
    }

    #[test]
    fn test_serializes_untagged() {
        let mut record = Record::new();
        record.insert("name".into(), "sw1".into());
        record.insert("zoning".into(), true.into());
        record.insert("members".into(), Value::List(vec!["a".into()]));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"sw1","zoning":true,"members":["a"]}"#
        );
    }
}
