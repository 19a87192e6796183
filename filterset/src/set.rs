//! Filter sets: validation and composition over a registry
//!
//! A `FilterSet` binds a shared registry to one concrete parameter map.
//! Construction performs no validation; `search()` validates, composes the
//! compound query, and returns the search handle in one pass, so the same
//! set can be asked again and always answers from the same input.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clause::Clause;
use crate::error::{ComposeError, FilterError, InvalidValue, ValidationError, ValidationFailures};
use crate::options::{RequestOptions, ResolvedOptions};
use crate::query::CompoundQuery;
use crate::registry::FilterRegistry;
use crate::search::SearchHandle;
use crate::value::Params;

/// Refine hook: runs after composition, before the handle is returned
type RefineFn = dyn Fn(SearchHandle) -> Result<SearchHandle, ComposeError> + Send + Sync;

/// What to do with parameters whose values fail validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidPolicy {
    /// Fail `search()` with one aggregate report naming every rejected parameter
    #[default]
    Reject,
    /// Drop rejected parameters and compose from the rest
    Skip,
}

/// What to do with parameters no binding claims
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownPolicy {
    /// Ignore them; keeps the set forward-compatible with unrelated parameters
    #[default]
    Ignore,
    /// Fail `search()` naming each unknown parameter
    Reject,
}

/// One successfully resolved parameter
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    pub parameter: String,
    pub clause: Clause,
}

/// Per-parameter accounting from one validation pass
#[derive(Debug, Clone)]
pub struct Validation {
    resolved: Vec<ResolvedFilter>,
    failures: ValidationFailures,
    unknown: Vec<String>,
    options: Option<ResolvedOptions>,
}

impl Validation {
    /// Resolved filters in registry declaration order
    pub fn resolved(&self) -> &[ResolvedFilter] {
        &self.resolved
    }

    /// Every rejected parameter with its reason
    pub fn failures(&self) -> &ValidationFailures {
        &self.failures
    }

    /// Parameter names no binding or reserved option claims
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runtime binding of a registry to one parameter map
pub struct FilterSet {
    registry: Arc<FilterRegistry>,
    params: Params,
    invalid: InvalidPolicy,
    unknown: UnknownPolicy,
    options: Option<RequestOptions>,
    refine: Option<Arc<RefineFn>>,
}

impl FilterSet {
    pub fn new(registry: Arc<FilterRegistry>, params: Params) -> Self {
        Self {
            registry,
            params,
            invalid: InvalidPolicy::default(),
            unknown: UnknownPolicy::default(),
            options: None,
            refine: None,
        }
    }

    pub fn invalid_policy(mut self, policy: InvalidPolicy) -> Self {
        self.invalid = policy;
        self
    }

    pub fn unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Accept sort and pagination parameters alongside the filters
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Attach a hook that adjusts the handle after composition
    ///
    /// The hook receives the fully composed handle and may replace it; its
    /// errors propagate from `search()` unmodified.
    pub fn with_refine<F>(mut self, hook: F) -> Self
    where
        F: Fn(SearchHandle) -> Result<SearchHandle, ComposeError> + Send + Sync + 'static,
    {
        self.refine = Some(Arc::new(hook));
        self
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Full per-parameter accounting for the bound input
    ///
    /// Pure: the same set always produces the same accounting. Errs only
    /// when a custom field fails to build its clause, which is not a
    /// per-parameter condition.
    pub fn validate(&self) -> Result<Validation, ComposeError> {
        let mut resolved = Vec::new();
        let mut failures = ValidationFailures::new();

        for binding in self.registry.bindings() {
            let Some(raw) = self.params.get(binding.parameter()) else {
                continue;
            };
            // Null means absent; empty text means "no filter"
            if raw.is_absent() || raw.is_empty_text() {
                continue;
            }
            match binding.field().coerce(raw) {
                Ok(value) => {
                    let clause =
                        binding
                            .field()
                            .clause(binding.target(), binding.lookup(), &value)?;
                    resolved.push(ResolvedFilter {
                        parameter: binding.parameter().to_string(),
                        clause,
                    });
                }
                Err(reason) => {
                    failures.push(ValidationError::new(binding.parameter(), reason));
                }
            }
        }

        let options = self
            .options
            .as_ref()
            .map(|options| options.resolve(&self.params, &mut failures));

        let mut unknown = Vec::new();
        for (name, _) in self.params.iter() {
            if self.registry.contains(name) {
                continue;
            }
            if self.options.as_ref().is_some_and(|o| o.is_reserved(name)) {
                continue;
            }
            unknown.push(name.clone());
        }

        Ok(Validation {
            resolved,
            failures,
            unknown,
            options,
        })
    }

    /// Validate, compose, and return the search handle
    ///
    /// Under the default policies this fails with one aggregate report when
    /// any parameter value is invalid, and silently ignores unknown names.
    pub fn search(&self) -> Result<SearchHandle, FilterError> {
        let validation = self.validate()?;

        let mut blocking = ValidationFailures::new();
        if self.invalid == InvalidPolicy::Reject && !validation.failures.is_empty() {
            blocking.extend(validation.failures.clone());
        }
        if self.unknown == UnknownPolicy::Reject {
            for name in &validation.unknown {
                blocking.push(ValidationError::new(name, InvalidValue::UnknownParameter));
            }
        }
        if !blocking.is_empty() {
            return Err(FilterError::Validation(blocking));
        }

        if !validation.failures.is_empty() {
            warn!(
                index = %self.registry.index(),
                skipped = validation.failures.len(),
                reasons = %validation.failures,
                "skipping invalid filter parameters"
            );
        }
        if !validation.unknown.is_empty() {
            debug!(
                index = %self.registry.index(),
                unknown = ?validation.unknown,
                "ignoring unknown parameters"
            );
        }

        let clauses: Vec<Clause> = validation
            .resolved
            .iter()
            .map(|filter| filter.clause.clone())
            .collect();
        let query = CompoundQuery::compose(clauses);
        debug!(
            index = %self.registry.index(),
            clauses = query.len(),
            "composed search query"
        );

        let mut handle = SearchHandle::new(self.registry.index(), query);
        if let Some(options) = validation.options {
            for (field, order) in options.sort {
                handle = handle.sort(field, order);
            }
            handle = handle.page(options.page, options.size);
        }

        if let Some(refine) = self.refine.as_deref() {
            handle = refine(handle)?;
        }

        Ok(handle)
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSet")
            .field("index", &self.registry.index())
            .field("params", &self.params.len())
            .field("invalid", &self.invalid)
            .field("unknown", &self.unknown)
            .field("refine", &self.refine.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
