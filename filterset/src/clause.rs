//! Resolved query clauses
//!
//! A clause is one atomic condition on one document field, ready to be
//! serialized into the backend query DSL.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::value::FieldValue;

/// Range bound operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

/// One atomic query condition on one document field
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Full-text match against an analyzed field
    Match { field: String, value: FieldValue },
    /// Exact value match
    Term { field: String, value: FieldValue },
    /// Pattern match; the pattern carries its `*` delimiters
    Wildcard { field: String, pattern: String },
    /// One range bound
    Range {
        field: String,
        op: RangeOp,
        value: FieldValue,
    },
}

impl Clause {
    /// Wildcard clause with `*` delimiters added per side when absent
    pub fn wildcard(field: impl Into<String>, raw: &str) -> Self {
        Self::Wildcard {
            field: field.into(),
            pattern: wildcard_pattern(raw),
        }
    }

    /// Target document field of this clause
    pub fn field(&self) -> &str {
        match self {
            Self::Match { field, .. } => field,
            Self::Term { field, .. } => field,
            Self::Wildcard { field, .. } => field,
            Self::Range { field, .. } => field,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// Serialize into the backend query DSL
    pub fn to_json(&self) -> Value {
        match self {
            Self::Match { field, value } => json!({
                "match": { (field.as_str()): value.to_json() }
            }),
            Self::Term { field, value } => json!({
                "term": { (field.as_str()): value.to_json() }
            }),
            Self::Wildcard { field, pattern } => json!({
                "wildcard": { (field.as_str()): { "value": pattern } }
            }),
            Self::Range { field, op, value } => json!({
                "range": { (field.as_str()): { (op.as_str()): value.to_json() } }
            }),
        }
    }
}

/// Wrap a raw wildcard input with `*` delimiters
///
/// A delimiter is added on each side only when the input does not already
/// end (or start) with one, so `"Pyth"` becomes `"*Pyth*"` while
/// `"*Pyth*"` stays unchanged.
pub fn wildcard_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    if !raw.starts_with('*') {
        pattern.push('*');
    }
    pattern.push_str(raw);
    if !raw.ends_with('*') {
        pattern.push('*');
    }
    pattern
}
