//! In-memory search backend
//!
//! Interprets the same request body a production backend receives, which
//! keeps tests and examples honest: nothing here short-circuits past the
//! composed JSON. Supported constructs are `match_all`, `bool`/`must`,
//! `match`, `term`, `wildcard`, and `range` queries plus `sort`, `from`,
//! `size`, and `highlight`.
//!
//! Matching approximates an analyzed text index: `match` compares lowercase
//! tokens (so "John" finds "John Doe" but not "Bob Johnson"), `wildcard`
//! patterns apply case-insensitively to the whole field text, and `range`
//! compares numbers, dates, or strings in that order of preference.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::search::{Hit, SearchBackend, SearchRequest, SearchResponse};
use crate::value::DateValue;

/// Error from the in-memory backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("unsupported query construct: {0}")]
    UnsupportedQuery(String),
}

impl MemoryError {
    fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedQuery(what.into())
    }
}

#[derive(Debug, Clone)]
struct Document {
    id: String,
    source: Value,
}

/// Searchable document store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: HashMap<String, Vec<Document>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, creating the index on first use
    pub fn insert(&mut self, index: impl Into<String>, id: impl Into<String>, source: Value) {
        self.indices
            .entry(index.into())
            .or_default()
            .push(Document {
                id: id.into(),
                source,
            });
    }

    /// Builder-style `insert` for fixture setup
    pub fn with_document(
        mut self,
        index: impl Into<String>,
        id: impl Into<String>,
        source: Value,
    ) -> Self {
        self.insert(index, id, source);
        self
    }

    /// Create an empty index so searches against it return zero hits
    pub fn create_index(&mut self, index: impl Into<String>) {
        self.indices.entry(index.into()).or_default();
    }
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    type Error = MemoryError;

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, MemoryError> {
        let documents = self
            .indices
            .get(&request.index)
            .ok_or_else(|| MemoryError::IndexNotFound(request.index.clone()))?;
        let body = &request.body;
        let query = body.get("query");

        let mut matched: Vec<&Document> = Vec::new();
        for document in documents {
            let hit = match query {
                // An absent query matches everything
                Some(query) => evaluate(query, &document.source)?,
                None => true,
            };
            if hit {
                matched.push(document);
            }
        }

        if let Some(sort) = body.get("sort").and_then(Value::as_array) {
            let keys = sort_spec(sort)?;
            matched.sort_by(|a, b| compare_documents(&a.source, &b.source, &keys));
        }

        let total = matched.len() as u64;
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .unwrap_or(matched.len());

        let highlighted = highlight_fields(body);
        let mut needles = Vec::new();
        if let Some(query) = query {
            collect_needles(query, &highlighted, &mut needles);
        }

        let hits: Vec<Hit> = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|document| Hit {
                id: document.id.clone(),
                score: Some(1.0),
                source: document.source.clone(),
                highlight: build_highlight(&document.source, &highlighted, &needles),
            })
            .collect();

        debug!(
            index = %request.index,
            total,
            returned = hits.len(),
            "memory backend search"
        );
        Ok(SearchResponse { total, hits })
    }
}

fn evaluate(query: &Value, source: &Value) -> Result<bool, MemoryError> {
    let Some(object) = query.as_object() else {
        return Err(MemoryError::unsupported("query is not an object"));
    };
    let Some((kind, spec)) = object.iter().next() else {
        return Err(MemoryError::unsupported("query object is empty"));
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "bool" => {
            if let Some(must) = spec.get("must").and_then(Value::as_array) {
                for clause in must {
                    if !evaluate(clause, source)? {
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        }
        "match" => {
            let (field, expected) = single_entry(spec, "match")?;
            Ok(field_value(source, field)
                .is_some_and(|document| text_match(document, expected)))
        }
        "term" => {
            let (field, expected) = single_entry(spec, "term")?;
            Ok(field_value(source, field).is_some_and(|document| term_eq(document, expected)))
        }
        "wildcard" => {
            let (field, spec) = single_entry(spec, "wildcard")?;
            let Some(pattern) = spec.get("value").and_then(Value::as_str) else {
                return Err(MemoryError::unsupported("wildcard without a value"));
            };
            let pattern = pattern.to_lowercase();
            Ok(field_value(source, field)
                .and_then(Value::as_str)
                .is_some_and(|text| glob_match(&pattern, &text.to_lowercase())))
        }
        "range" => {
            let (field, bounds) = single_entry(spec, "range")?;
            let Some(bounds) = bounds.as_object() else {
                return Err(MemoryError::unsupported("range without bounds"));
            };
            match field_value(source, field) {
                Some(document) => in_range(document, bounds),
                None => Ok(false),
            }
        }
        other => Err(MemoryError::unsupported(format!("'{other}' queries"))),
    }
}

/// The single `{field: spec}` entry inside a clause object
fn single_entry<'a>(spec: &'a Value, kind: &str) -> Result<(&'a str, &'a Value), MemoryError> {
    spec.as_object()
        .and_then(|object| object.iter().next())
        .map(|(field, spec)| (field.as_str(), spec))
        .ok_or_else(|| MemoryError::unsupported(format!("'{kind}' without a field")))
}

/// Navigate a dotted path ("author.name") through nested objects
fn field_value<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(source, |value, segment| value.get(segment))
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Analyzed-text match: every query token must appear among the field tokens
fn text_match(document: &Value, query: &Value) -> bool {
    match (document, query) {
        (Value::String(text), Value::String(query)) => {
            let document_tokens = tokens(text);
            tokens(query)
                .iter()
                .all(|token| document_tokens.contains(token))
        }
        (Value::Array(items), _) => items.iter().any(|item| text_match(item, query)),
        _ => term_eq(document, query),
    }
}

fn term_eq(document: &Value, expected: &Value) -> bool {
    match (document, expected) {
        // Numbers compare by value so an integer document field matches a float clause
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Array(items), _) => items.iter().any(|item| term_eq(item, expected)),
        _ => document == expected,
    }
}

fn in_range(document: &Value, bounds: &Map<String, Value>) -> Result<bool, MemoryError> {
    for (op, bound) in bounds {
        let ordering = compare_values(document, bound);
        let within = match op.as_str() {
            "gt" => ordering.is_some_and(|o| o == Ordering::Greater),
            "gte" => ordering.is_some_and(|o| o != Ordering::Less),
            "lt" => ordering.is_some_and(|o| o == Ordering::Less),
            "lte" => ordering.is_some_and(|o| o != Ordering::Greater),
            other => {
                return Err(MemoryError::unsupported(format!("range operator '{other}'")));
            }
        };
        if !within {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (DateValue::parse(a), DateValue::parse(b)) {
            (Some(a), Some(b)) => Some(a.as_instant().cmp(&b.as_instant())),
            _ => Some(a.cmp(b)),
        },
        _ => None,
    }
}

fn sort_spec(sort: &[Value]) -> Result<Vec<(String, bool)>, MemoryError> {
    let mut keys = Vec::new();
    for entry in sort {
        let Some(object) = entry.as_object() else {
            return Err(MemoryError::unsupported("sort entry is not an object"));
        };
        let Some((field, spec)) = object.iter().next() else {
            continue;
        };
        let descending = spec.get("order").and_then(Value::as_str) == Some("desc");
        keys.push((field.clone(), descending));
    }
    Ok(keys)
}

fn compare_documents(a: &Value, b: &Value, keys: &[(String, bool)]) -> Ordering {
    for (field, descending) in keys {
        let ordering = match (field_value(a, field), field_value(b, field)) {
            (Some(left), Some(right)) => {
                let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                if *descending { ordering.reverse() } else { ordering }
            }
            // Documents without the sort field go last in either direction
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Glob match where `*` spans any run of characters and `?` exactly one
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_inner(&pattern, &text)
}

fn glob_inner(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', rest)) => (0..=text.len()).any(|skip| glob_inner(rest, &text[skip..])),
        Some((&'?', rest)) => text
            .split_first()
            .is_some_and(|(_, tail)| glob_inner(rest, tail)),
        Some((expected, rest)) => text
            .split_first()
            .is_some_and(|(actual, tail)| actual == expected && glob_inner(rest, tail)),
    }
}

fn highlight_fields(body: &Value) -> Vec<String> {
    body.get("highlight")
        .and_then(|highlight| highlight.get("fields"))
        .and_then(Value::as_object)
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default()
}

/// Collect the lowercase fragments worth emphasizing in highlighted fields
fn collect_needles(query: &Value, fields: &[String], needles: &mut Vec<(String, String)>) {
    let Some(object) = query.as_object() else {
        return;
    };
    for (kind, spec) in object {
        match kind.as_str() {
            "bool" => {
                if let Some(must) = spec.get("must").and_then(Value::as_array) {
                    for clause in must {
                        collect_needles(clause, fields, needles);
                    }
                }
            }
            "match" | "term" => {
                for field in fields {
                    if let Some(value) = spec.get(field.as_str()).and_then(Value::as_str) {
                        for token in value.split(|c: char| !c.is_alphanumeric()) {
                            if !token.is_empty() {
                                needles.push((field.clone(), token.to_ascii_lowercase()));
                            }
                        }
                    }
                }
            }
            "wildcard" => {
                for field in fields {
                    let core = spec
                        .get(field.as_str())
                        .and_then(|inner| inner.get("value"))
                        .and_then(Value::as_str)
                        .map(|pattern| pattern.trim_matches(|c| c == '*' || c == '?'));
                    if let Some(core) = core {
                        if !core.is_empty() {
                            needles.push((field.clone(), core.to_ascii_lowercase()));
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn build_highlight(
    source: &Value,
    fields: &[String],
    needles: &[(String, String)],
) -> Option<Value> {
    let mut highlight = Map::new();
    for field in fields {
        let Some(text) = field_value(source, field).and_then(Value::as_str) else {
            continue;
        };
        let field_needles: Vec<&str> = needles
            .iter()
            .filter(|(needle_field, _)| needle_field == field)
            .map(|(_, needle)| needle.as_str())
            .collect();
        if let Some(fragment) = emphasize(text, &field_needles) {
            highlight.insert((*field).clone(), json!([fragment]));
        }
    }
    if highlight.is_empty() {
        None
    } else {
        Some(Value::Object(highlight))
    }
}

/// Wrap each needle occurrence in `<em>` tags, merging overlapping spans
///
/// Scans an ASCII-lowercased copy so byte offsets stay valid in the original.
fn emphasize(text: &str, needles: &[&str]) -> Option<String> {
    let folded = text.to_ascii_lowercase();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for needle in needles {
        let mut start = 0;
        while let Some(position) = folded[start..].find(needle) {
            let begin = start + position;
            spans.push((begin, begin + needle.len()));
            start = begin + needle.len();
        }
    }
    if spans.is_empty() {
        return None;
    }

    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (begin, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if begin <= *last_end => *last_end = (*last_end).max(end),
            _ => merged.push((begin, end)),
        }
    }

    let mut fragment = String::with_capacity(text.len() + merged.len() * 9);
    let mut cursor = 0;
    for (begin, end) in merged {
        fragment.push_str(&text[cursor..begin]);
        fragment.push_str("<em>");
        fragment.push_str(&text[begin..end]);
        fragment.push_str("</em>");
        cursor = end;
    }
    fragment.push_str(&text[cursor..]);
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::lookup::Lookup;
    use crate::options::RequestOptions;
    use crate::registry::FilterRegistry;
    use crate::set::FilterSet;
    use crate::value::Params;

    use super::*;

    fn book_backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_document(
                "books",
                "1",
                json!({
                    "title": "Python Programming",
                    "author": "John Doe",
                    "publication_date": "2023-01-01",
                    "price": 29.99,
                    "in_stock": true,
                }),
            )
            .with_document(
                "books",
                "2",
                json!({
                    "title": "Django Web Development",
                    "author": "Jane Smith",
                    "publication_date": "2023-02-01",
                    "price": 39.99,
                    "in_stock": true,
                }),
            )
            .with_document(
                "books",
                "3",
                json!({
                    "title": "Advanced Python",
                    "author": "Bob Johnson",
                    "publication_date": "2023-03-01",
                    "price": 49.99,
                    "in_stock": false,
                }),
            )
            .with_document(
                "books",
                "4",
                json!({
                    "title": "Python Advanced",
                    "author": "Jane Smith",
                    "publication_date": "2023-03-01",
                    "price": 49.99,
                    "in_stock": false,
                }),
            )
    }

    fn book_registry() -> Arc<FilterRegistry> {
        Arc::new(
            FilterRegistry::builder("books")
                .text("title", "title")
                .text("author", "author")
                .text_lookup("title_like", "title", Lookup::Wildcard)
                .date("publication_date", "publication_date")
                .date_lookup("published_after", "publication_date", Lookup::Gt)
                .numeric("price", "price")
                .numeric_lookup("price_min", "price", Lookup::Gte)
                .numeric_lookup("price_max", "price", Lookup::Lte)
                .boolean("in_stock", "in_stock")
                .build()
                .unwrap(),
        )
    }

    async fn ids_for(params: Params) -> Vec<String> {
        let backend = book_backend();
        let handle = FilterSet::new(book_registry(), params).search().unwrap();
        let response = handle.execute(&backend).await.unwrap();
        response.hits.into_iter().map(|hit| hit.id).collect()
    }

    #[tokio::test]
    async fn test_match_all_returns_everything() {
        assert_eq!(ids_for(Params::new()).await, ["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_match_uses_token_equality() {
        let ids = ids_for(Params::new().with("title", "Python")).await;
        assert_eq!(ids, ["1", "3", "4"]);

        // "John" is a whole token of "John Doe" but not of "Bob Johnson"
        let ids = ids_for(Params::new().with("author", "John")).await;
        assert_eq!(ids, ["1"]);

        let ids = ids_for(Params::new().with("author", "Jane")).await;
        assert_eq!(ids, ["2", "4"]);
    }

    #[tokio::test]
    async fn test_term_matches_numbers_and_booleans() {
        let ids = ids_for(Params::new().with("price", 49.99)).await;
        assert_eq!(ids, ["3", "4"]);

        let ids = ids_for(Params::new().with("in_stock", true)).await;
        assert_eq!(ids, ["1", "2"]);
    }

    #[tokio::test]
    async fn test_range_over_prices() {
        let params = Params::new().with("price_min", 30.0).with("price_max", 50.0);
        assert_eq!(ids_for(params).await, ["2", "3", "4"]);

        let params = Params::new().with("price_min", 29.99);
        assert_eq!(ids_for(params).await, ["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_date_range() {
        let params = Params::new().with("published_after", "2023-01-15");
        assert_eq!(ids_for(params).await, ["2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_wildcard_is_case_insensitive() {
        let ids = ids_for(Params::new().with("title_like", "Pyth")).await;
        assert_eq!(ids, ["1", "3", "4"]);

        let ids = ids_for(Params::new().with("title_like", "django")).await;
        assert_eq!(ids, ["2"]);
    }

    #[tokio::test]
    async fn test_combined_filters_intersect() {
        let params = Params::new().with("title", "Python").with("in_stock", true);
        assert_eq!(ids_for(params).await, ["1"]);
    }

    #[tokio::test]
    async fn test_sort_and_pagination() {
        let backend = book_backend();
        let params = Params::new()
            .with("sort", "-price")
            .with("page", 1)
            .with("page_size", 2);
        let handle = FilterSet::new(book_registry(), params)
            .request_options(RequestOptions::new())
            .search()
            .unwrap();

        let response = handle.execute(&backend).await.unwrap();
        assert_eq!(response.total, 4);
        let ids: Vec<&str> = response.hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, ["3", "4"]);
    }

    #[tokio::test]
    async fn test_slicing_happens_after_sorting() {
        let backend = book_backend();
        let request = SearchRequest {
            index: "books".to_string(),
            body: json!({
                "query": {"match_all": {}},
                "sort": [{"price": {"order": "asc"}}],
                "from": 1,
                "size": 2,
            }),
        };

        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total, 4);
        let prices: Vec<&Value> = response
            .hits
            .iter()
            .map(|hit| &hit.source["price"])
            .collect();
        assert_eq!(prices, [&json!(39.99), &json!(49.99)]);
    }

    #[tokio::test]
    async fn test_highlight_wraps_matches() {
        let backend = book_backend();
        let params = Params::new().with("author", "Jane").with("title", "Python");
        let handle = FilterSet::new(book_registry(), params)
            .search()
            .unwrap()
            .highlight("title");

        let response = handle.execute(&backend).await.unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(
            response.hits[0].highlight,
            Some(json!({"title": ["<em>Python</em> Advanced"]}))
        );
    }

    #[tokio::test]
    async fn test_missing_index_is_an_error() {
        let backend = book_backend();
        let handle = FilterSet::new(
            Arc::new(FilterRegistry::builder("journals").text("title", "title").build().unwrap()),
            Params::new(),
        )
        .search()
        .unwrap();

        let err = handle.execute(&backend).await.unwrap_err();
        assert_eq!(err, MemoryError::IndexNotFound("journals".to_string()));
        assert_eq!(err.to_string(), "index 'journals' does not exist");
    }

    #[tokio::test]
    async fn test_empty_index_returns_zero_hits() {
        let mut backend = MemoryBackend::new();
        backend.create_index("books");

        let handle = FilterSet::new(book_registry(), Params::new()).search().unwrap();
        let response = handle.execute(&backend).await.unwrap();
        assert_eq!(response.total, 0);
        assert!(response.hits.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_query_is_reported() {
        let backend = book_backend();
        let request = SearchRequest {
            index: "books".to_string(),
            body: json!({"query": {"fuzzy": {"title": "Pithon"}}}),
        };

        let err = backend.search(request).await.unwrap_err();
        assert_eq!(
            err,
            MemoryError::UnsupportedQuery("'fuzzy' queries".to_string())
        );
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*pyth*", "python programming"));
        assert!(glob_match("py?hon*", "python programming"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("*django*", "python programming"));
        assert!(!glob_match("python", "python programming"));
    }

    #[test]
    fn test_dotted_paths_navigate_nested_objects() {
        let source = json!({"author": {"name": "Jane Smith"}});
        assert_eq!(
            field_value(&source, "author.name"),
            Some(&json!("Jane Smith"))
        );
        assert_eq!(field_value(&source, "author.email"), None);
    }
}
