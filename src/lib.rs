//! # Ember
//!
//! The write and commit core of a segmented, in-memory full-text index.
//!
//! ## Features
//!
//! - Parallel document analysis on a bounded worker pool
//! - One immutable segment per batch
//! - Atomic, linearizable batch commits through a single-writer introducer
//! - Snapshot-isolated readers
//! - Versioned internal key/value metadata
//!
//! ```no_run
//! use ember::{Batch, Document, Engine, IndexConfig};
//!
//! # fn main() -> ember::Result<()> {
//! let engine = Engine::open(IndexConfig::default())?;
//!
//! let mut batch = Batch::new();
//! batch.update(Document::new_with_id("doc1").add_text("body", "hello world"));
//! batch.set_internal("checkpoint", "42");
//! engine.batch(batch)?;
//!
//! let reader = engine.reader()?;
//! assert_eq!(reader.live_ids(), vec!["doc1"]);
//! # Ok(())
//! # }
//! ```
pub mod analysis;
mod data;
mod engine;
mod error;
pub mod index;
pub mod query;

// Re-exports for the public API
pub use analysis::analyzer::analyzer::Analyzer;
pub use data::{CompositeField, DataValue, Document, Field, FieldOption, ID_FIELD};
pub use engine::Engine;
pub use engine::batch::{Batch, BatchResult};
pub use engine::config::{AnalysisFailurePolicy, IndexConfig, IndexConfigBuilder};
pub use engine::stats::StatsSnapshot;
pub use error::{DocumentFailure, EmberError, Result};
pub use index::queue::AnalysisQueue;
pub use index::reader::{IndexReader, TermMatch};
pub use query::{DocumentMatch, NumericRangeQuery, Query, TermQuery};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
