//! Filter field behaviors
//!
//! A `FilterField` coerces one raw parameter value into a typed value and
//! translates it into a single query clause. The built-in implementations
//! cover text, numeric, date, and boolean fields; custom implementations can
//! be registered for anything the built-ins cannot express.

use crate::clause::{Clause, RangeOp};
use crate::error::{ComposeError, InvalidValue};
use crate::lookup::Lookup;
use crate::value::{DateValue, FieldValue, RawValue, ValueKind};

/// Per-field coercion and clause translation
///
/// Implementations must be pure: no side effects, no backend calls. `coerce`
/// is never invoked for absent values; the filter set skips those first.
pub trait FilterField: Send + Sync {
    /// Value kind this field coerces to
    fn kind(&self) -> ValueKind;

    /// Whether the lookup operator is usable with this field
    ///
    /// Consulted at definition time. The default answers from the built-in
    /// per-kind table; custom fields may widen it.
    fn accepts(&self, lookup: Lookup) -> bool {
        Lookup::allowed_for(self.kind()).contains(&lookup)
    }

    /// Coerce one raw input value into a typed value
    fn coerce(&self, raw: &RawValue) -> Result<FieldValue, InvalidValue>;

    /// Translate a coerced value into one clause on the target field
    fn clause(
        &self,
        target: &str,
        lookup: Lookup,
        value: &FieldValue,
    ) -> Result<Clause, ComposeError> {
        build_clause(target, lookup, value)
    }
}

/// Standard lookup-to-clause translation shared by the built-in fields
pub fn build_clause(
    target: &str,
    lookup: Lookup,
    value: &FieldValue,
) -> Result<Clause, ComposeError> {
    let clause = match lookup {
        Lookup::Match => Clause::Match {
            field: target.to_string(),
            value: value.clone(),
        },
        Lookup::Term => Clause::Term {
            field: target.to_string(),
            value: value.clone(),
        },
        Lookup::Wildcard => match value {
            FieldValue::Text(text) => Clause::wildcard(target, text),
            other => {
                return Err(ComposeError::message(format!(
                    "wildcard lookup on '{}' requires text, got a {} value",
                    target,
                    other.kind()
                )));
            }
        },
        Lookup::Gt => range(target, RangeOp::Gt, value),
        Lookup::Gte => range(target, RangeOp::Gte, value),
        Lookup::Lt => range(target, RangeOp::Lt, value),
        Lookup::Lte => range(target, RangeOp::Lte, value),
    };
    Ok(clause)
}

fn range(target: &str, op: RangeOp, value: &FieldValue) -> Clause {
    Clause::Range {
        field: target.to_string(),
        op,
        value: value.clone(),
    }
}

/// Full-text field; accepts any string unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct TextField;

impl FilterField for TextField {
    fn kind(&self) -> ValueKind {
        ValueKind::Text
    }

    fn coerce(&self, raw: &RawValue) -> Result<FieldValue, InvalidValue> {
        match raw {
            RawValue::String(s) => Ok(FieldValue::Text(s.clone())),
            other => Err(InvalidValue::wrong_type(ValueKind::Text, other)),
        }
    }
}

/// Numeric field; accepts numbers and numeric strings, rejects non-finite values
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericField;

impl FilterField for NumericField {
    fn kind(&self) -> ValueKind {
        ValueKind::Numeric
    }

    fn coerce(&self, raw: &RawValue) -> Result<FieldValue, InvalidValue> {
        match raw {
            RawValue::Number(n) if n.is_finite() => Ok(FieldValue::Number(*n)),
            RawValue::Number(_) => Err(InvalidValue::NotFinite),
            RawValue::String(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
                _ => Err(InvalidValue::NotNumeric(s.clone())),
            },
            other => Err(InvalidValue::wrong_type(ValueKind::Numeric, other)),
        }
    }
}

/// Date field; accepts `YYYY-MM-DD` calendar dates and RFC 3339 instants
#[derive(Debug, Clone, Copy, Default)]
pub struct DateField;

impl FilterField for DateField {
    fn kind(&self) -> ValueKind {
        ValueKind::Date
    }

    fn coerce(&self, raw: &RawValue) -> Result<FieldValue, InvalidValue> {
        match raw {
            RawValue::String(s) => DateValue::parse(s)
                .map(FieldValue::Date)
                .ok_or_else(|| InvalidValue::NotDate(s.clone())),
            other => Err(InvalidValue::wrong_type(ValueKind::Date, other)),
        }
    }
}

/// Boolean field; accepts booleans and "true"/"false"/"1"/"0" strings
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanField;

impl FilterField for BooleanField {
    fn kind(&self) -> ValueKind {
        ValueKind::Boolean
    }

    fn coerce(&self, raw: &RawValue) -> Result<FieldValue, InvalidValue> {
        match raw {
            RawValue::Bool(b) => Ok(FieldValue::Bool(*b)),
            RawValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "0" => Ok(FieldValue::Bool(false)),
                _ => Err(InvalidValue::NotBoolean(s.clone())),
            },
            other => Err(InvalidValue::wrong_type(ValueKind::Boolean, other)),
        }
    }
}
