//! Request options parsed from the parameter map
//!
//! Full filter surfaces usually accept sorting and pagination through the
//! same flat parameter map as the filters themselves. `RequestOptions` is
//! that opt-in: it reserves the option parameter names, validates their
//! values, and feeds the results into the returned search handle.

use crate::error::{InvalidValue, ValidationError, ValidationFailures};
use crate::search::SortOrder;
use crate::value::{Params, RawValue, ValueKind};

/// Default page number (1-based)
pub const DEFAULT_PAGE: u64 = 1;
/// Default items per page
pub const DEFAULT_PAGE_SIZE: u64 = 50;
/// Maximum items per page
pub const MAX_PAGE_SIZE: u64 = 500;
/// Maximum page number to keep offsets bounded
pub const MAX_PAGE: u64 = 100;

/// Opt-in sort and pagination parameters
///
/// Reserved parameter names (by default `sort`, `page`, `page_size`) are
/// extracted before registry matching and never count as unknown. The sort
/// value is a single field name with a `-` prefix for descending order.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    sort_param: String,
    page_param: String,
    size_param: String,
    sortable: Option<Vec<String>>,
    default_size: u64,
    max_size: u64,
    max_page: u64,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            sort_param: "sort".to_string(),
            page_param: "page".to_string(),
            size_param: "page_size".to_string(),
            sortable: None,
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
            max_page: MAX_PAGE,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict sorting to the given fields
    ///
    /// Without a whitelist any field name is accepted.
    pub fn sortable(mut self, fields: &[&str]) -> Self {
        self.sortable = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Rename the sort parameter
    pub fn sort_param(mut self, name: impl Into<String>) -> Self {
        self.sort_param = name.into();
        self
    }

    /// Rename the page parameter
    pub fn page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = name.into();
        self
    }

    /// Rename the page-size parameter
    pub fn size_param(mut self, name: impl Into<String>) -> Self {
        self.size_param = name.into();
        self
    }

    pub fn default_size(mut self, size: u64) -> Self {
        self.default_size = size;
        self
    }

    pub fn max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    pub fn max_page(mut self, page: u64) -> Self {
        self.max_page = page;
        self
    }

    /// Whether a parameter name is one of the reserved option names
    pub fn is_reserved(&self, name: &str) -> bool {
        name == self.sort_param || name == self.page_param || name == self.size_param
    }

    /// Extract and validate the option values from the parameter map
    ///
    /// Invalid values are recorded in `failures`; the resolved options fall
    /// back to defaults for anything rejected or absent.
    pub(crate) fn resolve(&self, params: &Params, failures: &mut ValidationFailures) -> ResolvedOptions {
        let mut resolved = ResolvedOptions {
            sort: Vec::new(),
            page: DEFAULT_PAGE,
            size: self.default_size,
        };

        if let Some(raw) = present(params, &self.sort_param) {
            match self.parse_sort(raw) {
                Ok(key) => resolved.sort.push(key),
                Err(reason) => failures.push(ValidationError::new(&self.sort_param, reason)),
            }
        }

        if let Some(raw) = present(params, &self.page_param) {
            match self.parse_page(raw) {
                Ok(page) => resolved.page = page,
                Err(reason) => failures.push(ValidationError::new(&self.page_param, reason)),
            }
        }

        if let Some(raw) = present(params, &self.size_param) {
            match self.parse_size(raw) {
                Ok(size) => resolved.size = size,
                Err(reason) => failures.push(ValidationError::new(&self.size_param, reason)),
            }
        }

        resolved
    }

    fn parse_sort(&self, raw: &RawValue) -> Result<(String, SortOrder), InvalidValue> {
        let RawValue::String(s) = raw else {
            return Err(InvalidValue::wrong_type(ValueKind::Text, raw));
        };
        let (field, order) = match s.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Desc),
            None => (s.as_str(), SortOrder::Asc),
        };
        if field.is_empty() {
            return Err(InvalidValue::other("sort field is empty"));
        }
        if let Some(allowed) = &self.sortable {
            if !allowed.iter().any(|f| f == field) {
                return Err(InvalidValue::NotSortable(field.to_string()));
            }
        }
        Ok((field.to_string(), order))
    }

    fn parse_page(&self, raw: &RawValue) -> Result<u64, InvalidValue> {
        let page = parse_index(raw)?;
        if page < 1 || page > self.max_page {
            return Err(InvalidValue::other(format!(
                "page must be between 1 and {}",
                self.max_page
            )));
        }
        Ok(page)
    }

    fn parse_size(&self, raw: &RawValue) -> Result<u64, InvalidValue> {
        let size = parse_index(raw)?;
        if size < 1 || size > self.max_size {
            return Err(InvalidValue::other(format!(
                "page size must be between 1 and {}",
                self.max_size
            )));
        }
        Ok(size)
    }
}

/// Option values extracted from one parameter map
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub page: u64,
    pub size: u64,
}

fn present<'p>(params: &'p Params, name: &str) -> Option<&'p RawValue> {
    params
        .get(name)
        .filter(|raw| !raw.is_absent() && !raw.is_empty_text())
}

fn parse_index(raw: &RawValue) -> Result<u64, InvalidValue> {
    match raw {
        RawValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as u64),
        RawValue::Number(n) => Err(InvalidValue::NotInteger(n.to_string())),
        RawValue::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| InvalidValue::NotInteger(s.clone())),
        other => Err(InvalidValue::wrong_type(ValueKind::Numeric, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(options: &RequestOptions, params: &Params) -> (ResolvedOptions, ValidationFailures) {
        let mut failures = ValidationFailures::new();
        let resolved = options.resolve(params, &mut failures);
        (resolved, failures)
    }

    #[test]
    fn defaults_when_nothing_is_given() {
        let (resolved, failures) = resolve(&RequestOptions::new(), &Params::new());
        assert!(failures.is_empty());
        assert!(resolved.sort.is_empty());
        assert_eq!(resolved.page, DEFAULT_PAGE);
        assert_eq!(resolved.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn sort_prefix_selects_direction() {
        let options = RequestOptions::new();

        let params = Params::new().with("sort", "title_keyword");
        let (resolved, failures) = resolve(&options, &params);
        assert!(failures.is_empty());
        assert_eq!(resolved.sort, [("title_keyword".to_string(), SortOrder::Asc)]);

        let params = Params::new().with("sort", "-publication_date");
        let (resolved, _) = resolve(&options, &params);
        assert_eq!(
            resolved.sort,
            [("publication_date".to_string(), SortOrder::Desc)]
        );
    }

    #[test]
    fn sort_whitelist_is_enforced() {
        let options = RequestOptions::new().sortable(&["title_keyword", "price"]);

        let params = Params::new().with("sort", "price");
        let (_, failures) = resolve(&options, &params);
        assert!(failures.is_empty());

        let params = Params::new().with("sort", "-publication_date");
        let (resolved, failures) = resolve(&options, &params);
        assert!(resolved.sort.is_empty());
        assert_eq!(
            failures.find("sort").unwrap().reason,
            InvalidValue::NotSortable("publication_date".into())
        );
    }

    #[test]
    fn page_and_size_parse_numbers_and_strings() {
        let options = RequestOptions::new();
        let params = Params::new().with("page", 2).with("page_size", "25");
        let (resolved, failures) = resolve(&options, &params);
        assert!(failures.is_empty());
        assert_eq!(resolved.page, 2);
        assert_eq!(resolved.size, 25);
    }

    #[test]
    fn out_of_range_paging_is_rejected() {
        let options = RequestOptions::new();

        let params = Params::new().with("page", 0);
        let (resolved, failures) = resolve(&options, &params);
        assert_eq!(resolved.page, DEFAULT_PAGE);
        assert!(failures.find("page").is_some());

        let params = Params::new().with("page_size", 100_000);
        let (resolved, failures) = resolve(&options, &params);
        assert_eq!(resolved.size, DEFAULT_PAGE_SIZE);
        assert_eq!(
            failures.find("page_size").unwrap().reason,
            InvalidValue::other("page size must be between 1 and 500")
        );
    }

    #[test]
    fn fractional_and_malformed_pages_are_rejected() {
        let options = RequestOptions::new();

        let params = Params::new().with("page", 1.5);
        let (_, failures) = resolve(&options, &params);
        assert_eq!(
            failures.find("page").unwrap().reason,
            InvalidValue::NotInteger("1.5".into())
        );

        let params = Params::new().with("page", "two");
        let (_, failures) = resolve(&options, &params);
        assert_eq!(
            failures.find("page").unwrap().reason,
            InvalidValue::NotInteger("two".into())
        );

        let params = Params::new().with("page", true);
        let (_, failures) = resolve(&options, &params);
        assert!(failures.find("page").is_some());
    }

    #[test]
    fn reserved_names_and_renames() {
        let options = RequestOptions::new();
        assert!(options.is_reserved("sort"));
        assert!(options.is_reserved("page"));
        assert!(options.is_reserved("page_size"));
        assert!(!options.is_reserved("title"));

        let options = RequestOptions::new()
            .sort_param("order_by")
            .page_param("p")
            .size_param("limit");
        assert!(options.is_reserved("order_by"));
        assert!(options.is_reserved("limit"));
        assert!(!options.is_reserved("sort"));

        let params = Params::new().with("order_by", "-price").with("limit", 5);
        let (resolved, failures) = resolve(&options, &params);
        assert!(failures.is_empty());
        assert_eq!(resolved.sort, [("price".to_string(), SortOrder::Desc)]);
        assert_eq!(resolved.size, 5);
    }

    #[test]
    fn empty_and_null_option_values_fall_back_to_defaults() {
        let options = RequestOptions::new();
        let params = Params::new()
            .with("sort", "")
            .with("page", RawValue::Null);
        let (resolved, failures) = resolve(&options, &params);
        assert!(failures.is_empty());
        assert!(resolved.sort.is_empty());
        assert_eq!(resolved.page, DEFAULT_PAGE);
    }
}
