//! Error types for filter definition, validation, and composition
//!
//! Definition mistakes surface at registry build time as `DefinitionError`.
//! Per-parameter input problems are collected into `ValidationFailures` and
//! reported whole. `ComposeError` covers clause building and refine hooks.

use thiserror::Error;

use crate::lookup::Lookup;
use crate::value::ValueKind;

/// Definition-time error raised while building a filter registry
///
/// These are programming mistakes in the filter declaration itself and are
/// never deferred to runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The same parameter name was declared twice
    #[error("duplicate filter parameter '{0}'")]
    DuplicateParameter(String),

    /// The chosen lookup is not usable with the bound field kind
    #[error("lookup '{lookup}' is not allowed for {kind} filter '{parameter}'")]
    LookupNotAllowed {
        parameter: String,
        kind: ValueKind,
        lookup: Lookup,
    },

    /// A binding was declared with an empty parameter name
    #[error("filter parameter name is empty")]
    EmptyParameter,

    /// A binding has no target document field
    #[error("filter '{0}' has no target field")]
    MissingTargetField(String),

    /// The registry was built without a target index
    #[error("filter registry has no target index")]
    MissingIndex,
}

impl DefinitionError {
    pub fn duplicate(parameter: impl Into<String>) -> Self {
        Self::DuplicateParameter(parameter.into())
    }

    pub fn lookup_not_allowed(parameter: impl Into<String>, kind: ValueKind, lookup: Lookup) -> Self {
        Self::LookupNotAllowed {
            parameter: parameter.into(),
            kind,
            lookup,
        }
    }

    pub fn missing_target(parameter: impl Into<String>) -> Self {
        Self::MissingTargetField(parameter.into())
    }
}

/// Why a single raw value failed coercion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidValue {
    #[error("expected a number, got '{0}'")]
    NotNumeric(String),

    #[error("number is not finite")]
    NotFinite,

    #[error("expected a whole number, got '{0}'")]
    NotInteger(String),

    #[error("expected an ISO 8601 date, got '{0}'")]
    NotDate(String),

    #[error("expected a boolean, got '{0}'")]
    NotBoolean(String),

    /// Raw value has the wrong type entirely (e.g. a boolean where text is expected)
    #[error("expected a {expected} value, got {actual}")]
    WrongType {
        expected: ValueKind,
        actual: &'static str,
    },

    /// Parameter name not declared in the registry (strict unknown policy)
    #[error("unknown filter parameter")]
    UnknownParameter,

    #[error("cannot sort by '{0}'")]
    NotSortable(String),

    /// Free-form reason, for custom field implementations
    #[error("{0}")]
    Other(String),
}

impl InvalidValue {
    pub fn wrong_type(expected: ValueKind, actual: &crate::value::RawValue) -> Self {
        Self::WrongType {
            expected,
            actual: actual.type_name(),
        }
    }

    pub fn other(reason: impl Into<String>) -> Self {
        Self::Other(reason.into())
    }
}

/// One rejected parameter with its reason
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{parameter}: {reason}")]
pub struct ValidationError {
    pub parameter: String,
    pub reason: InvalidValue,
}

impl ValidationError {
    pub fn new(parameter: impl Into<String>, reason: InvalidValue) -> Self {
        Self {
            parameter: parameter.into(),
            reason,
        }
    }
}

/// Aggregate of every rejected parameter in one validation pass
///
/// Failures keep registry declaration order so reports are stable.
#[derive(Error, Debug, Clone, PartialEq, Default)]
#[error("invalid filter parameters: {}", list_failures(.failures))]
pub struct ValidationFailures {
    failures: Vec<ValidationError>,
}

fn list_failures(failures: &[ValidationError]) -> String {
    failures
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: ValidationError) {
        self.failures.push(failure);
    }

    pub fn extend(&mut self, other: ValidationFailures) {
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.failures.iter()
    }

    /// Failure recorded for the given parameter, if any
    pub fn find(&self, parameter: &str) -> Option<&ValidationError> {
        self.failures.iter().find(|f| f.parameter == parameter)
    }
}

/// Error from clause building or a refine hook
///
/// Validation catches bad input before clauses are built, so this only
/// occurs with defective custom fields or hooks. It propagates unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("query composition failed: {message}")]
pub struct ComposeError {
    pub message: String,
}

impl ComposeError {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by `FilterSet::search`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error(transparent)]
    Validation(#[from] ValidationFailures),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl FilterError {
    /// Validation failures, when this is a validation error
    pub fn failures(&self) -> Option<&ValidationFailures> {
        match self {
            Self::Validation(failures) => Some(failures),
            Self::Compose(_) => None,
        }
    }
}
