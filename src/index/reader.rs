//! Readers pinned to one snapshot.

use std::sync::Arc;

use crate::data::Field;
use crate::index::segment::{DocNum, SegmentId};
use crate::index::snapshot::{IndexSnapshot, SegmentSnapshot};

/// A live occurrence of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    /// External document ID.
    pub id: String,
    pub segment_id: SegmentId,
    pub doc_num: DocNum,
    pub frequency: u32,
    pub field_length: u32,
}

/// A consistent, read-only view of the index.
///
/// The reader holds its snapshot alive until it is closed or dropped.
/// Batches committed after the reader was obtained are never visible
/// through it.
#[derive(Debug, Clone)]
pub struct IndexReader {
    snapshot: Arc<IndexSnapshot>,
}

impl IndexReader {
    pub(crate) fn new(snapshot: Arc<IndexSnapshot>) -> Self {
        IndexReader { snapshot }
    }

    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        &self.snapshot
    }

    pub fn version(&self) -> u64 {
        self.snapshot.version()
    }

    pub fn segments(&self) -> &[SegmentSnapshot] {
        self.snapshot.segments()
    }

    /// Number of visible documents.
    pub fn doc_count(&self) -> u64 {
        self.snapshot.doc_count()
    }

    pub fn internal(&self, key: &[u8]) -> Option<&[u8]> {
        self.snapshot.internal(key)
    }

    pub fn document_locations(&self, id: &str) -> Vec<(SegmentId, DocNum)> {
        self.snapshot.document_locations(id)
    }

    /// Stored fields of the visible document with this ID.
    pub fn document(&self, id: &str) -> Option<&[Field]> {
        let (segment_id, doc_num) = self.document_locations(id).into_iter().next()?;
        self.segments()
            .iter()
            .find(|s| s.id() == segment_id)
            .and_then(|s| s.segment().stored_fields(doc_num))
    }

    /// Every visible occurrence of `term` in `field`.
    pub fn term_matches(&self, field: &str, term: &str) -> Vec<TermMatch> {
        let mut matches = Vec::new();
        for entry in self.segments() {
            let Some(postings) = entry.segment().postings(field, term) else {
                continue;
            };
            for posting in postings {
                if entry.is_deleted(posting.doc_num) {
                    continue;
                }
                let Some(id) = entry.segment().external_id(posting.doc_num) else {
                    continue;
                };
                matches.push(TermMatch {
                    id: id.to_string(),
                    segment_id: entry.id(),
                    doc_num: posting.doc_num,
                    frequency: posting.frequency,
                    field_length: posting.field_length,
                });
            }
        }
        matches
    }

    /// External IDs of all visible documents, sorted.
    pub fn live_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .segments()
            .iter()
            .flat_map(|entry| {
                entry
                    .live_docs()
                    .filter_map(|n| entry.segment().external_id(n).map(str::to_string))
            })
            .collect();
        ids.sort();
        ids
    }

    /// Release the snapshot.
    pub fn close(self) {}
}
