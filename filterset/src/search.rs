//! Search handle and backend boundary
//!
//! `search()` returns a `SearchHandle`: the composed query plus the request
//! options the caller may still attach (sorting, highlighting, pagination).
//! Execution is delegated to a `SearchBackend` implementation; this crate
//! never talks to the backend itself.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::query::CompoundQuery;

/// Sort direction for one sort key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pre-filtered search request under construction
///
/// Owned solely by the caller once returned from `FilterSet::search`. The
/// filter engine only guarantees the compound query was attached; everything
/// else on the handle is the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHandle {
    index: String,
    query: CompoundQuery,
    sort: Vec<(String, SortOrder)>,
    highlight: Vec<String>,
    from: Option<u64>,
    size: Option<u64>,
}

impl SearchHandle {
    pub(crate) fn new(index: impl Into<String>, query: CompoundQuery) -> Self {
        Self {
            index: index.into(),
            query,
            sort: Vec::new(),
            highlight: Vec::new(),
            from: None,
            size: None,
        }
    }

    /// Target index this search runs against
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn query(&self) -> &CompoundQuery {
        &self.query
    }

    /// Mutable access to the query; for refine hooks that drop or add clauses
    pub fn query_mut(&mut self) -> &mut CompoundQuery {
        &mut self.query
    }

    /// Replace the attached query entirely
    pub fn with_query(mut self, query: CompoundQuery) -> Self {
        self.query = query;
        self
    }

    /// Append a sort key
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    /// Request highlighting for a field
    pub fn highlight(mut self, field: impl Into<String>) -> Self {
        self.highlight.push(field.into());
        self
    }

    /// Result offset
    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Result count limit
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Offset and size from a 1-based page number
    pub fn page(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.from((page - 1) * per_page).size(per_page)
    }

    pub fn sort_keys(&self) -> &[(String, SortOrder)] {
        &self.sort
    }

    /// Full request body in the backend's query DSL
    pub fn body(&self) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("query".to_string(), self.query.to_json());

        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, order)| json!({ (field.as_str()): { "order": order.as_str() } }))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }

        if !self.highlight.is_empty() {
            let mut fields = serde_json::Map::new();
            for field in &self.highlight {
                fields.insert(field.clone(), json!({}));
            }
            body.insert("highlight".to_string(), json!({ "fields": fields }));
        }

        if let Some(from) = self.from {
            body.insert("from".to_string(), from.into());
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), size.into());
        }

        Value::Object(body)
    }

    /// Request this handle describes
    pub fn request(&self) -> SearchRequest {
        SearchRequest {
            index: self.index.clone(),
            body: self.body(),
        }
    }

    /// Run the search against a backend
    pub async fn execute<B: SearchBackend>(&self, backend: &B) -> Result<SearchResponse, B::Error> {
        debug!(index = %self.index, clauses = self.query.len(), "executing search");
        backend.search(self.request()).await
    }
}

/// One search request: target index plus request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub index: String,
    pub body: Value,
}

/// Backend-native search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching documents before offset/size slicing
    pub total: u64,
    pub hits: Vec<Hit>,
}

/// One matching document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Raw document source as the backend returned it
    pub source: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

/// Execution boundary to the external document-search backend
///
/// The engine neither wraps nor interprets backend errors; they reach the
/// caller as the backend's own error type.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    type Error: Send;

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, Self::Error>;
}
