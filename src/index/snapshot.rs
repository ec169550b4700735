//! Immutable, versioned root index state.
//!
//! A snapshot is the unit readers see: an ordered list of segments, each
//! with the bitmap of its document numbers that are no longer visible, plus
//! the internal key/value namespace. Snapshots are never modified once
//! published; the next one is derived from the previous one by
//! [`IndexSnapshot::introduce`].

use std::sync::Arc;

use ahash::AHashMap;
use roaring::RoaringBitmap;

use crate::error::{EmberError, Result};
use crate::index::introducer::Introduction;
use crate::index::segment::{DocNum, Segment, SegmentId};

/// A segment as seen by one snapshot.
#[derive(Debug, Clone)]
pub struct SegmentSnapshot {
    id: SegmentId,
    segment: Arc<dyn Segment>,
    deleted: Arc<RoaringBitmap>,
}

impl SegmentSnapshot {
    pub fn new(id: SegmentId, segment: Arc<dyn Segment>) -> Self {
        SegmentSnapshot {
            id,
            segment,
            deleted: Arc::new(RoaringBitmap::new()),
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn segment(&self) -> &Arc<dyn Segment> {
        &self.segment
    }

    /// Document numbers of this segment that are obsolete in this snapshot.
    pub fn deleted(&self) -> &RoaringBitmap {
        &self.deleted
    }

    pub fn is_deleted(&self, doc_num: DocNum) -> bool {
        self.deleted.contains(doc_num)
    }

    pub fn live_doc_count(&self) -> u64 {
        self.segment.doc_count() - self.deleted.len()
    }

    /// Visible document numbers for the given external IDs.
    pub fn live_doc_numbers(&self, ids: &[String]) -> RoaringBitmap {
        let mut nums = self.segment.doc_numbers(ids);
        nums -= self.deleted.as_ref();
        nums
    }

    /// Visible document numbers in ascending order.
    pub fn live_docs(&self) -> impl Iterator<Item = DocNum> + '_ {
        (0..self.segment.doc_count() as DocNum).filter(|n| !self.deleted.contains(*n))
    }

    fn with_obsoletes(&self, obsoletes: &RoaringBitmap) -> Self {
        if obsoletes.is_subset(&self.deleted) {
            return self.clone();
        }
        SegmentSnapshot {
            id: self.id,
            segment: Arc::clone(&self.segment),
            deleted: Arc::new(self.deleted.as_ref() | obsoletes),
        }
    }
}

/// What applying an introduction did, for stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntroduceReport {
    /// Segments whose obsoletes had to be computed at apply time because
    /// they were published after the submitter's optimistic read.
    pub obsoletes_recomputed: usize,
    /// Documents newly hidden in older segments.
    pub docs_obsoleted: u64,
}

/// The root index state.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    version: u64,
    segments: Vec<SegmentSnapshot>,
    internal: Arc<AHashMap<Vec<u8>, Vec<u8>>>,
}

impl IndexSnapshot {
    /// The snapshot of a freshly opened, empty index (version 0).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn segments(&self) -> &[SegmentSnapshot] {
        &self.segments
    }

    pub fn internal(&self, key: &[u8]) -> Option<&[u8]> {
        self.internal.get(key).map(|v| v.as_slice())
    }

    pub fn internal_len(&self) -> usize {
        self.internal.len()
    }

    /// Number of visible documents.
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.live_doc_count()).sum()
    }

    /// Where an external ID is visible, as `(segment id, doc number)` pairs.
    ///
    /// A consistent snapshot yields at most one entry.
    pub fn document_locations(&self, id: &str) -> Vec<(SegmentId, DocNum)> {
        let ids = [id.to_string()];
        self.segments
            .iter()
            .flat_map(|s| s.live_doc_numbers(&ids).into_iter().map(move |n| (s.id, n)))
            .collect()
    }

    /// Build the snapshot that follows this one once `intro` is applied.
    ///
    /// Precomputed obsoletes are trusted for every segment they cover:
    /// segment content is immutable, so a segment's answer for a set of IDs
    /// never changes. Segments published after the precomputation are
    /// checked here.
    pub fn introduce(&self, intro: &Introduction) -> Result<(IndexSnapshot, IntroduceReport)> {
        let version = self
            .version
            .checked_add(1)
            .ok_or_else(|| EmberError::index("snapshot version counter overflow"))?;
        if let Some(last) = self.segments.last()
            && intro.id <= last.id
        {
            return Err(EmberError::index(format!(
                "segment {} introduced after segment {}",
                intro.id, last.id
            )));
        }

        let mut report = IntroduceReport::default();
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        for entry in &self.segments {
            let obsoletes = match intro.obsoletes.get(&entry.id) {
                Some(precomputed) => precomputed.clone(),
                None if intro.ids.is_empty() => RoaringBitmap::new(),
                None => {
                    report.obsoletes_recomputed += 1;
                    entry.segment.doc_numbers(&intro.ids)
                }
            };
            report.docs_obsoleted += (&obsoletes - entry.deleted.as_ref()).len();
            segments.push(entry.with_obsoletes(&obsoletes));
        }

        if intro.segment.doc_count() > 0 {
            segments.push(SegmentSnapshot::new(intro.id, Arc::clone(&intro.segment)));
        }

        let internal = if intro.internal.is_empty() {
            Arc::clone(&self.internal)
        } else {
            let mut map = self.internal.as_ref().clone();
            for (key, value) in &intro.internal {
                match value {
                    Some(value) => {
                        map.insert(key.clone(), value.clone());
                    }
                    None => {
                        map.remove(key);
                    }
                }
            }
            Arc::new(map)
        };

        Ok((
            IndexSnapshot {
                version,
                segments,
                internal,
            },
            report,
        ))
    }

    #[cfg(test)]
    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
    use crate::analysis::analyzer::standard::StandardAnalyzer;
    use crate::data::{Document, Field};
    use crate::index::analyzed::analyze_document;
    use crate::index::segment::memory::MemorySegment;

    fn segment(ids: &[&str]) -> Arc<dyn Segment> {
        let analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
        let results = ids
            .iter()
            .map(|id| {
                let mut doc = Document::new_with_id(*id).add_text("body", "text");
                doc.fields.push(Field::identity(id));
                analyze_document(doc, &analyzer, false).unwrap()
            })
            .collect();
        Arc::new(MemorySegment::from_analyzed(results).unwrap())
    }

    fn intro(id: SegmentId, segment: Arc<dyn Segment>, ids: &[&str]) -> Introduction {
        Introduction {
            id,
            segment,
            ids: ids.iter().map(|s| s.to_string()).collect(),
            obsoletes: AHashMap::new(),
            internal: BTreeMap::new(),
        }
    }

    #[test]
    fn test_introduce_appends_and_bumps_version() {
        let root = IndexSnapshot::empty();
        let (next, report) = root.introduce(&intro(1, segment(&["a", "b"]), &["a", "b"])).unwrap();

        assert_eq!(root.version(), 0);
        assert_eq!(next.version(), 1);
        assert_eq!(next.segments().len(), 1);
        assert_eq!(next.doc_count(), 2);
        assert_eq!(report.docs_obsoleted, 0);
    }

    #[test]
    fn test_precomputed_obsoletes_are_applied() {
        let (s1, _) = IndexSnapshot::empty()
            .introduce(&intro(1, segment(&["a", "b"]), &["a", "b"]))
            .unwrap();

        let mut second = intro(2, segment(&["a"]), &["a"]);
        second.obsoletes.insert(1, RoaringBitmap::from_iter([0u32]));
        let (s2, report) = s1.introduce(&second).unwrap();

        assert_eq!(report.obsoletes_recomputed, 0);
        assert_eq!(report.docs_obsoleted, 1);
        assert!(s2.segments()[0].is_deleted(0));
        assert!(!s1.segments()[0].is_deleted(0), "published snapshots never change");
        assert_eq!(s2.document_locations("a"), vec![(2, 0)]);
        assert_eq!(s2.doc_count(), 2);
    }

    #[test]
    fn test_missing_obsoletes_are_recomputed() {
        let (s1, _) = IndexSnapshot::empty()
            .introduce(&intro(1, segment(&["x"]), &["x"]))
            .unwrap();
        // Precomputed against the empty snapshot, so segment 1 is not covered.
        let (s2, report) = s1.introduce(&intro(2, segment(&["x"]), &["x"])).unwrap();

        assert_eq!(report.obsoletes_recomputed, 1);
        assert_eq!(s2.document_locations("x"), vec![(2, 0)]);
    }

    #[test]
    fn test_delete_only_introduction() {
        let (s1, _) = IndexSnapshot::empty()
            .introduce(&intro(1, segment(&["a"]), &["a"]))
            .unwrap();
        let (s2, _) = s1
            .introduce(&intro(2, Arc::new(MemorySegment::empty()), &["a"]))
            .unwrap();

        assert_eq!(s2.segments().len(), 1, "empty segments are not kept");
        assert_eq!(s2.doc_count(), 0);
        assert!(s2.document_locations("a").is_empty());
    }

    #[test]
    fn test_internal_ops() {
        let mut first = intro(1, Arc::new(MemorySegment::empty()), &[]);
        first.internal.insert(b"k1".to_vec(), Some(b"v1".to_vec()));
        first.internal.insert(b"k2".to_vec(), Some(b"v2".to_vec()));
        let (s1, _) = IndexSnapshot::empty().introduce(&first).unwrap();

        let mut second = intro(2, Arc::new(MemorySegment::empty()), &[]);
        second.internal.insert(b"k1".to_vec(), None);
        let (s2, _) = s1.introduce(&second).unwrap();

        assert_eq!(s1.internal(b"k1"), Some(&b"v1"[..]));
        assert_eq!(s2.internal(b"k1"), None);
        assert_eq!(s2.internal(b"k2"), Some(&b"v2"[..]));
        assert_eq!(s2.internal_len(), 1);
    }

    #[test]
    fn test_version_overflow_is_fatal() {
        let root = IndexSnapshot::empty().with_version(u64::MAX);
        let err = root
            .introduce(&intro(1, Arc::new(MemorySegment::empty()), &[]))
            .unwrap_err();
        assert!(matches!(err, EmberError::Index(_)));
    }

    #[test]
    fn test_out_of_order_segment_is_rejected() {
        let (s1, _) = IndexSnapshot::empty()
            .introduce(&intro(5, segment(&["a"]), &["a"]))
            .unwrap();
        assert!(s1.introduce(&intro(3, segment(&["b"]), &["b"])).is_err());
    }
}
