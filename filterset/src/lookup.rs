//! Lookup operators
//!
//! A lookup selects how a field value is matched against the document:
//! full-text `match`, exact `term`, `wildcard` patterns, or range bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::ValueKind;

/// Lookup operators usable in field bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookup {
    /// Full-text match (analyzed)
    Match,
    /// Exact value match
    Term,
    /// Pattern match with `*` delimiters
    Wildcard,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Lookup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Term => "term",
            Self::Wildcard => "wildcard",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// Lookups the built-in field kinds accept
    pub fn allowed_for(kind: ValueKind) -> &'static [Lookup] {
        match kind {
            ValueKind::Text => &[Self::Match, Self::Term, Self::Wildcard],
            ValueKind::Numeric | ValueKind::Date => {
                &[Self::Term, Self::Gt, Self::Gte, Self::Lt, Self::Lte]
            }
            ValueKind::Boolean => &[Self::Term],
        }
    }

    /// Default lookup per field kind: `match` for text, `term` otherwise
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => Self::Match,
            ValueKind::Numeric | ValueKind::Date | ValueKind::Boolean => Self::Term,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
