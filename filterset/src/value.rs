//! Raw input parameters and coerced field values
//!
//! `Params` is the flat parameter map handed to a filter set; `RawValue` is
//! one entry of it. Coercion turns raw entries into typed `FieldValue`s.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value kinds a filter field can coerce to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Numeric,
    Date,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Boolean => "boolean",
        };
        write!(f, "{}", s)
    }
}

/// One raw parameter value as supplied by the caller
///
/// Only flat scalars are accepted; nested arrays or objects fail
/// deserialization. `Null` is treated as an absent parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    String(String),
    Null,
}

impl RawValue {
    /// Raw type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Null => "null",
        }
    }

    /// Null entries count as absent
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Empty text means "no filter" and is skipped during validation
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Flat parameter map (parameter name to raw value)
///
/// Deserializes from a flat JSON object. Iteration order is sorted by
/// parameter name, which keeps unknown-parameter reporting deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    entries: BTreeMap<String, RawValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object, e.g. `Params::from_json(json!({"author": "Jane"}))`
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, RawValue)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A coerced date value
///
/// Calendar dates and instants are kept apart so each renders back in the
/// form it was given (`2023-02-01` vs RFC 3339).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateValue {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl DateValue {
    /// Parse a calendar date (`YYYY-MM-DD`) or an RFC 3339 instant
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Self::Day(day));
        }
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Self::Instant(dt.with_timezone(&Utc)))
    }

    /// Instant for comparisons; calendar dates count as midnight UTC
    pub fn as_instant(&self) -> DateTime<Utc> {
        match self {
            Self::Instant(dt) => *dt,
            Self::Day(day) => day
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc(),
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            Self::Instant(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// A coerced, typed filter value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateValue),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Number(_) => ValueKind::Numeric,
            Self::Date(_) => ValueKind::Date,
            Self::Bool(_) => ValueKind::Boolean,
        }
    }

    /// JSON representation used inside query clauses
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => match serde_json::Number::from_f64(*n) {
                Some(num) => Value::Number(num),
                // Coercion rejects non-finite numbers, so this does not occur
                None => Value::Null,
            },
            Self::Date(d) => Value::String(d.to_string()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }
}
