pub mod batch;
pub mod config;
pub mod stats;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ahash::{AHashMap, AHashSet};
use crossbeam_channel::{Receiver, unbounded};
use parking_lot::RwLock;

use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::data::{Document, Field, ID_FIELD};
use crate::error::{DocumentFailure, EmberError, Result};
use crate::index::analyzed::{AnalysisResult, analyze_document};
use crate::index::introducer::{Introducer, Root};
use crate::index::queue::{AnalysisOutcome, AnalysisQueue, AnalysisWork};
use crate::index::reader::IndexReader;
use crate::index::segment::Segment;
use crate::index::segment::memory::MemorySegment;
use crate::index::snapshot::IndexSnapshot;

use self::batch::{Batch, BatchResult};
use self::config::{AnalysisFailurePolicy, IndexConfig};
use self::stats::{Stats, StatsSnapshot};

/// An in-memory segmented index.
///
/// Batches are analyzed in parallel on a worker pool, turned into one
/// immutable segment each, and published by a single introducer thread as
/// a new index snapshot. [`Engine::batch`] returns only after its snapshot
/// is visible, so a reader obtained afterwards always sees the batch.
pub struct Engine {
    config: IndexConfig,
    analyzer: Arc<PerFieldAnalyzer>,
    queue: Arc<AnalysisQueue>,
    owns_queue: bool,
    root: Root,
    introducer: Introducer,
    stats: Arc<Stats>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("version", &self.root.read().version())
            .field("queue", &self.queue)
            .field("introducer", &self.introducer)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl Engine {
    /// Open an empty index with its own analysis worker pool.
    pub fn open(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let queue = Arc::new(AnalysisQueue::new(
            config.analysis_workers,
            config.analysis_queue_capacity,
        )?);
        Self::build(config, queue, true)
    }

    /// Open an empty index that analyzes on a shared worker pool.
    ///
    /// The pool is left running when the engine closes.
    pub fn open_with_queue(config: IndexConfig, queue: Arc<AnalysisQueue>) -> Result<Self> {
        config.validate()?;
        if queue.is_closed() {
            return Err(EmberError::Closed);
        }
        Self::build(config, queue, false)
    }

    fn build(config: IndexConfig, queue: Arc<AnalysisQueue>, owns_queue: bool) -> Result<Self> {
        let stats = Arc::new(Stats::default());
        let root: Root = Arc::new(RwLock::new(Arc::new(IndexSnapshot::empty())));
        let introducer = Introducer::start(Arc::clone(&root), Arc::clone(&stats))?;
        let analyzer = Arc::new(config.build_analyzer());

        log::info!(
            "opened index with {} analysis workers",
            queue.num_workers()
        );
        Ok(Engine {
            config,
            analyzer,
            queue,
            owns_queue,
            root,
            introducer,
            stats,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EmberError::Closed);
        }
        if let Some(reason) = self.introducer.failure() {
            return Err(EmberError::index(format!("index is unusable: {reason}")));
        }
        Ok(())
    }

    /// Close the index.
    ///
    /// Batches already handed to the introducer are published; batches that
    /// race with close fail with [`EmberError::Closed`]. Readers keep working
    /// on the snapshots they hold. Calling close again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let result = self.introducer.close();
        if self.owns_queue {
            self.queue.close();
        }
        log::info!("closed index at version {}", self.root.read().version());
        result
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Commit a batch atomically.
    ///
    /// Either every operation of the batch becomes visible in one snapshot,
    /// or the batch fails and none does. Under
    /// [`AnalysisFailurePolicy::SkipDocument`] documents that fail analysis
    /// are dropped instead and reported in the result.
    pub fn batch(&self, batch: Batch) -> Result<BatchResult> {
        let result = self.apply_batch(batch);
        if let Err(e) = &result {
            self.stats.incr_batch_errors();
            log::debug!("batch failed: {e}");
        }
        result
    }

    fn apply_batch(&self, batch: Batch) -> Result<BatchResult> {
        self.check_open()?;
        batch.validate()?;
        self.stats.record_batch(
            batch.num_updates(),
            batch.num_deletes(),
            batch.num_internal_sets(),
            batch.num_internal_deletes(),
        );

        let (ops, internal) = batch.into_parts();
        let mut ids = Vec::with_capacity(ops.len());
        let mut updates = Vec::new();
        for (id, op) in ops {
            if let Some(mut document) = op {
                document.fields.push(Field::identity(&id));
                updates.push(document);
            }
            ids.push(id);
        }

        let (results, failures) = self.analyze_all(updates)?;
        if !failures.is_empty() {
            self.stats.add_analysis_failures(failures.len());
            for failure in &failures {
                log::warn!("document '{}' failed analysis: {}", failure.doc_id, failure.reason);
            }
            match self.config.analysis_failure_policy {
                AnalysisFailurePolicy::Reject => {
                    return Err(EmberError::BatchRejected { failures });
                }
                AnalysisFailurePolicy::SkipDocument => {
                    let failed: AHashSet<&str> =
                        failures.iter().map(|f| f.doc_id.as_str()).collect();
                    ids.retain(|id| !failed.contains(id.as_str()));
                }
            }
        }

        self.stats.add_plain_text_bytes(
            results
                .iter()
                .flat_map(|r| r.document.fields.iter())
                .filter(|f| f.name != ID_FIELD)
                .map(|f| f.value.plain_text_bytes())
                .sum(),
        );
        let segment: Arc<dyn Segment> = Arc::new(MemorySegment::from_analyzed(results)?);

        // Segment contents never change, so obsoletes computed against this
        // snapshot stay correct; the introducer covers segments added later.
        let current = self.root.read().clone();
        let mut obsoletes = AHashMap::new();
        if !ids.is_empty() {
            for entry in current.segments() {
                obsoletes.insert(entry.id(), entry.segment().doc_numbers(&ids));
            }
        }
        drop(current);

        let ticket = self.introducer.submit(segment, ids, obsoletes, internal)?;
        let segment_id = ticket.segment_id();
        let version = ticket.wait(self.config.introduction_timeout())?;

        Ok(BatchResult {
            version,
            segment_id,
            failures,
        })
    }

    /// Fan documents out to the worker pool and wait for every result.
    fn analyze_all(
        &self,
        documents: Vec<Document>,
    ) -> Result<(Vec<AnalysisResult>, Vec<DocumentFailure>)> {
        let expected = documents.len();
        let start = Instant::now();
        let (sender, receiver) = unbounded();
        for document in documents {
            self.queue.queue(AnalysisWork::new(
                document,
                Arc::clone(&self.analyzer),
                self.config.store_term_locations,
                sender.clone(),
            ))?;
        }
        drop(sender);

        let collected = collect_outcomes(&receiver, expected)?;
        self.stats.add_analysis_time(start.elapsed());
        Ok(collected)
    }

    /// Insert or replace one document.
    pub fn update(&self, document: Document) -> Result<BatchResult> {
        let mut batch = Batch::new();
        batch.update(document);
        self.batch(batch)
    }

    pub fn delete(&self, id: impl Into<String>) -> Result<BatchResult> {
        let mut batch = Batch::new();
        batch.delete(id);
        self.batch(batch)
    }

    pub fn set_internal(
        &self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Result<BatchResult> {
        let mut batch = Batch::new();
        batch.set_internal(key, value);
        self.batch(batch)
    }

    pub fn delete_internal(&self, key: impl Into<Vec<u8>>) -> Result<BatchResult> {
        let mut batch = Batch::new();
        batch.delete_internal(key);
        self.batch(batch)
    }

    /// A reader pinned to the current snapshot.
    pub fn reader(&self) -> Result<IndexReader> {
        if self.is_closed() {
            return Err(EmberError::Closed);
        }
        Ok(IndexReader::new(self.root.read().clone()))
    }

    /// Analyze a document on the calling thread without indexing it.
    pub fn analyze(&self, mut document: Document) -> Result<AnalysisResult> {
        let id = document
            .id
            .clone()
            .ok_or_else(|| EmberError::invalid_argument("document has no id"))?;
        if document.has_field(ID_FIELD) {
            return Err(EmberError::invalid_argument(format!(
                "document '{id}' uses reserved field name '{ID_FIELD}'"
            )));
        }
        document.fields.push(Field::identity(&id));
        analyze_document(document, &self.analyzer, self.config.store_term_locations)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn stats_map(&self) -> HashMap<String, u64> {
        self.stats.snapshot().to_map()
    }
}

/// Gather `expected` analysis outcomes, split into results and failures.
///
/// Every queued work item sends exactly one outcome, so running out of
/// senders early means a worker went away without answering.
fn collect_outcomes(
    receiver: &Receiver<AnalysisOutcome>,
    expected: usize,
) -> Result<(Vec<AnalysisResult>, Vec<DocumentFailure>)> {
    let mut results = Vec::with_capacity(expected);
    let mut failures = Vec::new();
    for _ in 0..expected {
        let (doc_id, outcome) = receiver
            .recv()
            .map_err(|_| EmberError::internal("analysis worker exited"))?;
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => failures.push(DocumentFailure {
                doc_id,
                reason: e.to_string(),
            }),
        }
    }
    Ok((results, failures))
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("failed to close index: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::analyzer::{Analyzer, TokenStream};
    use crate::analysis::analyzer::standard::StandardAnalyzer;

    fn engine() -> Engine {
        Engine::open(IndexConfig::builder().analysis_workers(2).build()).unwrap()
    }

    #[test]
    fn test_insert_update_delete() {
        let engine = engine();

        let first = engine
            .update(Document::new_with_id("doc1").add_text("text", "a"))
            .unwrap();
        assert_eq!(first.version, 1);
        let reader = engine.reader().unwrap();
        assert_eq!(reader.live_ids(), vec!["doc1"]);

        let second = engine
            .update(Document::new_with_id("doc1").add_text("text", "b"))
            .unwrap();
        let reader = engine.reader().unwrap();
        assert_eq!(
            reader.document_locations("doc1"),
            vec![(second.segment_id, 0)]
        );
        assert!(reader.segments()[0].is_deleted(0));

        engine.delete("doc1").unwrap();
        let reader = engine.reader().unwrap();
        assert!(reader.document_locations("doc1").is_empty());
        assert_eq!(reader.doc_count(), 0);
        assert_eq!(reader.version(), 3);
    }

    #[test]
    fn test_update_then_delete_in_one_batch() {
        let engine = engine();
        let mut batch = Batch::new();
        batch.update(Document::new_with_id("x").add_text("body", "gone"));
        batch.delete("x");
        engine.batch(batch).unwrap();

        assert!(engine.reader().unwrap().document_locations("x").is_empty());
    }

    #[test]
    fn test_reject_policy_is_atomic() {
        let engine = engine();
        let mut batch = Batch::new();
        batch.update(Document::new_with_id("good").add_text("body", "fine"));
        batch.update(Document::new_with_id("bad").add_float("score", f64::NAN));
        batch.set_internal("k", "v");

        match engine.batch(batch).unwrap_err() {
            EmberError::BatchRejected { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].doc_id, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
        let reader = engine.reader().unwrap();
        assert_eq!(reader.version(), 0);
        assert!(reader.internal(b"k").is_none());
        assert_eq!(engine.stats().batch_errors, 1);
    }

    #[test]
    fn test_analyze_does_not_index() {
        let engine = engine();
        let result = engine
            .analyze(Document::new_with_id("d").add_text("body", "Hello World"))
            .unwrap();
        assert_eq!(result.doc_id, "d");
        assert!(result.analyzed[0].get("hello").is_some());
        assert_eq!(engine.reader().unwrap().version(), 0);
        assert!(engine.analyze(Document::new()).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let engine = engine();
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(engine.update(Document::new_with_id("a")).unwrap_err().is_shutdown());
        assert!(engine.reader().unwrap_err().is_shutdown());
    }

    #[test]
    fn test_lost_worker_is_an_internal_error() {
        let (sender, receiver) = unbounded();
        sender
            .send(("a".to_string(), Err(EmberError::analysis("bad value"))))
            .unwrap();
        drop(sender);

        let err = collect_outcomes(&receiver, 2).unwrap_err();
        assert!(matches!(err, EmberError::Internal(_)));
        assert!(!err.is_shutdown());
        assert_eq!(err.to_string(), "Internal error: analysis worker exited");
    }

    #[derive(Debug)]
    struct PanickingAnalyzer;

    impl Analyzer for PanickingAnalyzer {
        fn analyze(&self, text: &str) -> Result<TokenStream> {
            if text.contains("boom") {
                panic!("cannot analyze {text}");
            }
            StandardAnalyzer::new().analyze(text)
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[test]
    fn test_analyzer_panic_rejects_batch_and_engine_keeps_working() {
        let engine = Engine::open(
            IndexConfig::builder()
                .analysis_workers(1)
                .analyzer(Arc::new(PanickingAnalyzer))
                .build(),
        )
        .unwrap();

        let err = engine
            .update(Document::new_with_id("bad").add_text("body", "boom"))
            .unwrap_err();
        assert!(!err.is_shutdown());
        let EmberError::BatchRejected { failures } = err else {
            panic!("expected a rejected batch");
        };
        assert_eq!(failures[0].doc_id, "bad");
        assert!(failures[0].reason.contains("analyzer panicked"));

        let result = engine
            .update(Document::new_with_id("good").add_text("body", "fine"))
            .unwrap();
        assert_eq!(result.version, 1);
        assert_eq!(engine.reader().unwrap().live_ids(), vec!["good"]);
    }
}
