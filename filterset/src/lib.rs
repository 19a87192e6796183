//! Declarative filter sets compiled into document-search queries
//!
//! A [`FilterRegistry`] declares which request parameters may filter an index
//! and how each value translates into a query clause. A [`FilterSet`] binds
//! the registry to one parameter map, validates every value, and composes the
//! surviving clauses into a single AND query behind a [`SearchHandle`].
//! Validation failures are collected and reported whole rather than one at a
//! time, and execution is delegated to whatever implements [`SearchBackend`].
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use filterset::{FilterRegistry, FilterSet, Lookup, Params};
//!
//! let registry = Arc::new(
//!     FilterRegistry::builder("books")
//!         .text("title", "title")
//!         .numeric_lookup("price_min", "price", Lookup::Gte)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let params = Params::new().with("title", "Python").with("price_min", 20.0);
//! let handle = FilterSet::new(registry, params).search().unwrap();
//! assert_eq!(handle.index(), "books");
//! println!("{}", handle.body());
//! ```

mod clause;
mod error;
mod fields;
mod lookup;
pub mod memory;
mod options;
mod query;
mod registry;
mod search;
mod set;
mod value;

pub use clause::{Clause, RangeOp, wildcard_pattern};
pub use error::{
    ComposeError, DefinitionError, FilterError, InvalidValue, ValidationError, ValidationFailures,
};
pub use fields::{BooleanField, DateField, FilterField, NumericField, TextField, build_clause};
pub use lookup::Lookup;
pub use options::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, RequestOptions};
pub use query::CompoundQuery;
pub use registry::{FieldBinding, FilterRegistry, RegistryBuilder};
pub use search::{Hit, SearchBackend, SearchHandle, SearchRequest, SearchResponse, SortOrder};
pub use set::{FilterSet, InvalidPolicy, ResolvedFilter, UnknownPolicy, Validation};
pub use value::{DateValue, FieldValue, Params, RawValue, ValueKind};
