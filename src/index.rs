//! Segmented index internals.
//!
//! # Module Structure
//!
//! - `analyzed`: per-document analysis results and composite aggregation
//! - `queue`: bounded analysis worker pool
//! - `segment`: segment capability and the in-memory segment
//! - `snapshot`: immutable, versioned root index state
//! - `introducer`: single-writer loop publishing new snapshots
//! - `reader`: readers pinned to one snapshot

pub mod analyzed;
pub mod introducer;
pub mod queue;
pub mod reader;
pub mod segment;
pub mod snapshot;

pub use analyzed::{AnalysisResult, analyze_document};
pub use queue::{AnalysisQueue, AnalysisWork};
pub use reader::IndexReader;
pub use segment::memory::MemorySegment;
pub use segment::{DocNum, Posting, Segment, SegmentId};
pub use snapshot::{IndexSnapshot, SegmentSnapshot};
