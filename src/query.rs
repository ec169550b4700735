//! Query objects validated at the index boundary.
//!
//! Queries run against an [`IndexReader`] and therefore only ever see the
//! snapshot the reader is pinned to. Every query is validated before it
//! touches the index.

pub mod numeric_range;
pub mod term;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::reader::IndexReader;

pub use numeric_range::NumericRangeQuery;
pub use term::TermQuery;

/// A visible document matched by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub id: String,
    pub score: f64,
}

pub trait Query: Send + Sync + Debug {
    /// Reject malformed queries before they reach the index.
    fn validate(&self) -> Result<()>;

    /// Matching documents, ordered by external ID.
    fn search(&self, reader: &IndexReader) -> Result<Vec<DocumentMatch>>;
}

fn default_boost() -> f64 {
    1.0
}
