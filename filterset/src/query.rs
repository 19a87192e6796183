//! Compound query composition
//!
//! Clauses combine into a single "all must match" query. Zero clauses means
//! an unfiltered search that matches every document.

use serde_json::{Value, json};

use crate::clause::Clause;

/// Ordered AND combination of clauses
///
/// Clause order follows registry declaration order. AND is commutative, so
/// the order is cosmetic, but keeping it fixed makes serialized queries
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundQuery {
    clauses: Vec<Clause>,
}

impl CompoundQuery {
    /// Empty query matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine resolved clauses, preserving their order
    pub fn compose(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Keep only clauses the predicate accepts; for refine hooks
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Clause) -> bool,
    {
        self.clauses.retain(keep);
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True when no clause restricts the search
    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Serialize into the backend query DSL
    ///
    /// Emits `match_all` when unfiltered, otherwise a `bool` query with all
    /// clauses under `must`.
    pub fn to_json(&self) -> Value {
        if self.clauses.is_empty() {
            return json!({ "match_all": {} });
        }
        let must: Vec<Value> = self.clauses.iter().map(Clause::to_json).collect();
        json!({ "bool": { "must": must } })
    }
}

impl From<Vec<Clause>> for CompoundQuery {
    fn from(clauses: Vec<Clause>) -> Self {
        Self::compose(clauses)
    }
}
