//! Declarative filter registry
//!
//! A registry is the static declaration of a filter set: which parameter
//! names exist, which document field each one targets, and how values are
//! matched. Built once per filter-set definition and shared read-only by
//! every runtime `FilterSet`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::DefinitionError;
use crate::fields::{BooleanField, DateField, FilterField, NumericField, TextField};
use crate::lookup::Lookup;
use crate::value::ValueKind;

/// One declared parameter binding
///
/// Immutable after the registry is built.
#[derive(Clone)]
pub struct FieldBinding {
    parameter: String,
    target: String,
    lookup: Lookup,
    field: Arc<dyn FilterField>,
}

impl FieldBinding {
    /// Parameter name callers use in the input map
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Target document field (dot-path into the document schema)
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    pub fn field(&self) -> &dyn FilterField {
        self.field.as_ref()
    }
}

impl fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("parameter", &self.parameter)
            .field("target", &self.target)
            .field("lookup", &self.lookup)
            .field("kind", &self.field.kind())
            .finish()
    }
}

/// Static mapping from parameter names to field bindings
///
/// Iteration yields bindings in declaration order; composed queries keep
/// that order.
#[derive(Debug)]
pub struct FilterRegistry {
    index: String,
    bindings: Vec<FieldBinding>,
    by_name: HashMap<String, usize>,
}

impl FilterRegistry {
    /// Start declaring filters against a target index
    pub fn builder(index: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            index: index.into(),
            bindings: Vec::new(),
        }
    }

    /// Target index searches are bound to
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn get(&self, parameter: &str) -> Option<&FieldBinding> {
        self.by_name.get(parameter).map(|&i| &self.bindings[i])
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.by_name.contains_key(parameter)
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Builder for `FilterRegistry`
///
/// Declarations are collected as-is; `build` runs every definition-time
/// check and reports the first violation.
pub struct RegistryBuilder {
    index: String,
    bindings: Vec<FieldBinding>,
}

impl RegistryBuilder {
    /// Full-text filter with the default `match` lookup
    pub fn text(self, parameter: impl Into<String>, target: impl Into<String>) -> Self {
        self.text_lookup(parameter, target, Lookup::default_for(ValueKind::Text))
    }

    /// Text filter with an explicit lookup (`match`, `term`, or `wildcard`)
    pub fn text_lookup(
        self,
        parameter: impl Into<String>,
        target: impl Into<String>,
        lookup: Lookup,
    ) -> Self {
        self.bind(parameter, target, lookup, Arc::new(TextField))
    }

    /// Numeric filter with the default `term` lookup
    pub fn numeric(self, parameter: impl Into<String>, target: impl Into<String>) -> Self {
        self.numeric_lookup(parameter, target, Lookup::default_for(ValueKind::Numeric))
    }

    /// Numeric filter with an explicit lookup (`term` or a range bound)
    pub fn numeric_lookup(
        self,
        parameter: impl Into<String>,
        target: impl Into<String>,
        lookup: Lookup,
    ) -> Self {
        self.bind(parameter, target, lookup, Arc::new(NumericField))
    }

    /// Date filter with the default `term` lookup
    pub fn date(self, parameter: impl Into<String>, target: impl Into<String>) -> Self {
        self.date_lookup(parameter, target, Lookup::default_for(ValueKind::Date))
    }

    /// Date filter with an explicit lookup (`term` or a range bound)
    pub fn date_lookup(
        self,
        parameter: impl Into<String>,
        target: impl Into<String>,
        lookup: Lookup,
    ) -> Self {
        self.bind(parameter, target, lookup, Arc::new(DateField))
    }

    /// Boolean filter (`term` lookup only)
    pub fn boolean(self, parameter: impl Into<String>, target: impl Into<String>) -> Self {
        self.bind(
            parameter,
            target,
            Lookup::default_for(ValueKind::Boolean),
            Arc::new(BooleanField),
        )
    }

    /// Filter backed by a custom field implementation
    pub fn custom(
        self,
        parameter: impl Into<String>,
        target: impl Into<String>,
        lookup: Lookup,
        field: impl FilterField + 'static,
    ) -> Self {
        self.bind(parameter, target, lookup, Arc::new(field))
    }

    fn bind(
        mut self,
        parameter: impl Into<String>,
        target: impl Into<String>,
        lookup: Lookup,
        field: Arc<dyn FilterField>,
    ) -> Self {
        self.bindings.push(FieldBinding {
            parameter: parameter.into(),
            target: target.into(),
            lookup,
            field,
        });
        self
    }

    /// Run all definition-time checks and build the registry
    pub fn build(self) -> Result<FilterRegistry, DefinitionError> {
        if self.index.is_empty() {
            return Err(DefinitionError::MissingIndex);
        }

        let mut by_name = HashMap::with_capacity(self.bindings.len());
        for (position, binding) in self.bindings.iter().enumerate() {
            if binding.parameter.is_empty() {
                return Err(DefinitionError::EmptyParameter);
            }
            if binding.target.is_empty() {
                return Err(DefinitionError::missing_target(&binding.parameter));
            }
            if !binding.field.accepts(binding.lookup) {
                return Err(DefinitionError::lookup_not_allowed(
                    &binding.parameter,
                    binding.field.kind(),
                    binding.lookup,
                ));
            }
            if by_name.insert(binding.parameter.clone(), position).is_some() {
                return Err(DefinitionError::duplicate(&binding.parameter));
            }
        }

        debug!(
            index = %self.index,
            filters = self.bindings.len(),
            "filter registry built"
        );

        Ok(FilterRegistry {
            index: self.index,
            bindings: self.bindings,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_registry() -> FilterRegistry {
        FilterRegistry::builder("books")
            .text("title", "title")
            .text("author", "author")
            .date("publication_date", "publication_date")
            .numeric("price", "price")
            .numeric_lookup("price_min", "price", Lookup::Gte)
            .numeric_lookup("price_max", "price", Lookup::Lte)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_keeps_declaration_order() {
        let registry = book_registry();
        assert_eq!(registry.index(), "books");
        assert_eq!(registry.len(), 6);

        let parameters: Vec<&str> = registry.bindings().iter().map(FieldBinding::parameter).collect();
        assert_eq!(
            parameters,
            ["title", "author", "publication_date", "price", "price_min", "price_max"]
        );
    }

    #[test]
    fn lookup_defaults_per_field_kind() {
        let registry = book_registry();
        assert_eq!(registry.get("title").unwrap().lookup(), Lookup::Match);
        assert_eq!(registry.get("price").unwrap().lookup(), Lookup::Term);
        assert_eq!(registry.get("price_min").unwrap().lookup(), Lookup::Gte);
    }

    #[test]
    fn several_parameters_may_share_a_target() {
        let registry = book_registry();
        assert_eq!(registry.get("price").unwrap().target(), "price");
        assert_eq!(registry.get("price_min").unwrap().target(), "price");
        assert_eq!(registry.get("price_max").unwrap().target(), "price");
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let err = FilterRegistry::builder("books")
            .text("title", "title")
            .text_lookup("title", "title_keyword", Lookup::Term)
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::duplicate("title"));
    }

    #[test]
    fn disallowed_lookup_is_rejected() {
        let err = FilterRegistry::builder("books")
            .numeric_lookup("price", "price", Lookup::Wildcard)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::lookup_not_allowed("price", ValueKind::Numeric, Lookup::Wildcard)
        );

        let err = FilterRegistry::builder("books")
            .text_lookup("title", "title", Lookup::Gte)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::lookup_not_allowed("title", ValueKind::Text, Lookup::Gte)
        );
    }

    #[test]
    fn empty_declarations_are_rejected() {
        let err = FilterRegistry::builder("")
            .text("title", "title")
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::MissingIndex);

        let err = FilterRegistry::builder("books")
            .text("", "title")
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::EmptyParameter);

        let err = FilterRegistry::builder("books")
            .text("title", "")
            .build()
            .unwrap_err();
        assert_eq!(err, DefinitionError::missing_target("title"));
    }

    #[test]
    fn get_and_contains() {
        let registry = book_registry();
        assert!(registry.contains("author"));
        assert!(!registry.contains("publisher"));
        assert!(registry.get("publisher").is_none());
        assert!(!registry.is_empty());

        let binding = registry.get("price_max").unwrap();
        assert_eq!(binding.lookup(), Lookup::Lte);
        assert_eq!(binding.field().kind(), ValueKind::Numeric);
    }
}
