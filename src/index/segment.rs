//! Segment capability.
//!
//! A segment is an immutable set of analyzed documents addressed by dense,
//! segment-local document numbers. Segments are never rewritten; apparent
//! deletion is tracked outside the segment by the snapshot that holds it.

pub mod memory;

use std::fmt::Debug;

use roaring::RoaringBitmap;

use crate::analysis::token::TokenLocation;
use crate::data::Field;

/// Process-wide segment identifier. Strictly increasing, never reused.
pub type SegmentId = u64;

/// Segment-local, dense document number.
pub type DocNum = u32;

/// One occurrence of a term in one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_num: DocNum,
    pub frequency: u32,
    /// Number of tokens in the field this posting belongs to.
    pub field_length: u32,
    pub locations: Vec<TokenLocation>,
}

/// What the commit pipeline and readers need from a segment.
///
/// In-memory segments are produced by batches; persisted segments built by
/// a merge process satisfy the same contract.
pub trait Segment: Send + Sync + Debug {
    /// Number of documents stored in the segment, deleted or not.
    fn doc_count(&self) -> u64;

    /// Document numbers of the given external IDs that this segment holds.
    fn doc_numbers(&self, ids: &[String]) -> RoaringBitmap;

    /// External ID of a document number.
    fn external_id(&self, doc_num: DocNum) -> Option<&str>;

    /// Postings for `term` in `field`, ordered by document number.
    fn postings(&self, field: &str, term: &str) -> Option<&[Posting]>;

    /// Stored fields of a document.
    fn stored_fields(&self, doc_num: DocNum) -> Option<&[Field]>;

    /// Values of an indexed numeric field, in document order.
    fn numeric_values(&self, field: &str, doc_num: DocNum) -> Option<&[f64]>;

    /// Names of all indexed fields.
    fn fields(&self) -> Vec<&str>;

    /// Approximate memory footprint.
    fn size_in_bytes(&self) -> usize;
}
