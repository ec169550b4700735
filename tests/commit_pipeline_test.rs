use std::sync::Arc;

use ember::{
    AnalysisFailurePolicy, AnalysisQueue, Batch, CompositeField, Document, EmberError, Engine,
    IndexConfig, NumericRangeQuery, Query, TermQuery,
};

fn open(policy: AnalysisFailurePolicy) -> ember::Result<Engine> {
    let config = IndexConfig::builder()
        .analysis_workers(2)
        .analysis_queue_capacity(4)
        .analysis_failure_policy(policy)
        .build();
    Engine::open(config)
}

#[test]
fn test_overwrite_then_delete_keeps_one_live_occurrence() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;

    // 1. Insert doc1
    let first = engine.update(Document::new_with_id("doc1").add_text("text", "a"))?;
    let reader = engine.reader()?;
    assert_eq!(reader.doc_count(), 1);
    assert_eq!(reader.document_locations("doc1"), vec![(first.segment_id, 0)]);

    // 2. Overwrite doc1
    let second = engine.update(Document::new_with_id("doc1").add_text("text", "b"))?;
    assert!(second.segment_id > first.segment_id);
    let reader = engine.reader()?;
    assert_eq!(reader.document_locations("doc1"), vec![(second.segment_id, 0)]);
    let old = &reader.segments()[0];
    assert_eq!(old.id(), first.segment_id);
    assert!(old.is_deleted(0), "old doc1 is obsoleted");
    assert_eq!(TermQuery::new("text", "a").search(&reader)?.len(), 0);
    assert_eq!(TermQuery::new("text", "b").search(&reader)?.len(), 1);

    // 3. Delete doc1
    let third = engine.delete("doc1")?;
    assert_eq!(third.version, second.version + 1);
    let reader = engine.reader()?;
    assert!(reader.document_locations("doc1").is_empty());
    assert!(reader.live_ids().is_empty());

    Ok(())
}

#[test]
fn test_empty_batch_advances_version_only() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    engine.update(Document::new_with_id("a").add_text("body", "x"))?;
    let before = engine.reader()?;

    let result = engine.batch(Batch::new())?;

    let after = engine.reader()?;
    assert_eq!(result.version, before.version() + 1);
    assert_eq!(after.version(), result.version);
    assert_eq!(after.live_ids(), before.live_ids());
    assert_eq!(after.segments().len(), before.segments().len());
    Ok(())
}

#[test]
fn test_documents_and_internal_ops_publish_together() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;

    let mut batch = Batch::new();
    batch.update(Document::new_with_id("a").add_text("body", "one"));
    batch.update(Document::new_with_id("b").add_text("body", "two"));
    batch.set_internal("checkpoint", "7");
    let result = engine.batch(batch)?;

    let reader = engine.reader()?;
    assert_eq!(reader.version(), result.version);
    assert_eq!(reader.live_ids(), vec!["a", "b"]);
    assert_eq!(reader.internal(b"checkpoint"), Some(&b"7"[..]));

    engine.delete_internal("checkpoint")?;
    assert!(engine.reader()?.internal(b"checkpoint").is_none());
    assert_eq!(reader.internal(b"checkpoint"), Some(&b"7"[..]));
    Ok(())
}

#[test]
fn test_rejected_batch_changes_nothing() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    engine.update(Document::new_with_id("keep").add_text("body", "v1"))?;

    let mut batch = Batch::new();
    batch.update(Document::new_with_id("keep").add_text("body", "v2"));
    batch.update(Document::new_with_id("broken").add_float("score", f64::INFINITY));
    batch.set_internal("k", "v");

    let err = engine.batch(batch).unwrap_err();
    let EmberError::BatchRejected { failures } = err else {
        panic!("expected a rejected batch");
    };
    assert_eq!(failures[0].doc_id, "broken");

    let reader = engine.reader()?;
    assert_eq!(reader.version(), 1);
    assert_eq!(TermQuery::new("body", "v1").search(&reader)?.len(), 1);
    assert!(reader.internal(b"k").is_none());
    Ok(())
}

#[test]
fn test_skip_policy_keeps_previous_version_of_failed_document() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::SkipDocument)?;
    engine.update(Document::new_with_id("a").add_text("body", "old"))?;

    let mut batch = Batch::new();
    batch.update(Document::new_with_id("a").add_float("score", f64::NAN));
    batch.update(Document::new_with_id("b").add_text("body", "new"));
    let result = engine.batch(batch)?;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].doc_id, "a");

    let reader = engine.reader()?;
    assert_eq!(reader.live_ids(), vec!["a", "b"]);
    assert_eq!(TermQuery::new("body", "old").search(&reader)?.len(), 1);
    assert_eq!(engine.stats().analysis_failures, 1);
    Ok(())
}

#[test]
fn test_composite_field_is_searchable() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    engine.update(
        Document::new_with_id("doc")
            .add_text("title", "quick fox")
            .add_text("body", "lazy dog")
            .add_composite(CompositeField::new("_all")),
    )?;

    let reader = engine.reader()?;
    assert_eq!(TermQuery::new("_all", "fox").search(&reader)?.len(), 1);
    assert_eq!(TermQuery::new("_all", "dog").search(&reader)?.len(), 1);
    assert_eq!(TermQuery::new("_all", "doc").search(&reader)?.len(), 0);
    Ok(())
}

#[test]
fn test_repeated_field_matches_once() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    engine.update(
        Document::new_with_id("doc")
            .add_text("tag", "rust")
            .add_text("tag", "rust")
            .add_integer("year", 2023)
            .add_integer("year", 2024),
    )?;

    let reader = engine.reader()?;
    assert_eq!(TermQuery::new("tag", "rust").search(&reader)?.len(), 1);
    let first_year = NumericRangeQuery::new(Some(2023.0), Some(2024.0)).with_field("year");
    assert_eq!(first_year.search(&reader)?.len(), 1);
    Ok(())
}

#[test]
fn test_composite_named_like_a_field_is_rejected() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    let err = engine
        .update(
            Document::new_with_id("doc")
                .add_text("body", "lazy dog")
                .add_composite(CompositeField::new("body")),
        )
        .unwrap_err();
    assert!(matches!(err, EmberError::InvalidArgument(_)));
    assert_eq!(engine.reader()?.version(), 0);
    Ok(())
}

#[test]
fn test_invalid_batches_are_rejected_up_front() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;

    let mut batch = Batch::new();
    batch.update(Document::new_with_id("x").add_keyword("_id", "spoof"));
    assert!(matches!(
        engine.batch(batch).unwrap_err(),
        EmberError::InvalidArgument(_)
    ));
    assert_eq!(engine.reader()?.version(), 0);
    assert_eq!(engine.stats().batch_errors, 1);
    Ok(())
}

#[test]
fn test_stats_are_exposed_as_json_and_map() -> ember::Result<()> {
    let engine = open(AnalysisFailurePolicy::Reject)?;
    engine.update(Document::new_with_id("a").add_text("body", "hello"))?;
    engine.delete("a")?;
    engine.set_internal("k", "v")?;

    let stats = engine.stats();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.updates, 1);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.internal_sets, 1);
    assert_eq!(stats.introductions_applied, 3);
    assert_eq!(stats.root_version, 3);
    assert_eq!(stats.plain_text_bytes_indexed, 5);
    assert_eq!(stats.docs_obsoleted, 1);

    let json: serde_json::Value = serde_json::from_str(&stats.to_json()?)?;
    assert_eq!(json["introductions_applied"], 3);
    assert_eq!(engine.stats_map().get("deletes"), Some(&1));
    Ok(())
}

#[test]
fn test_engines_share_an_analysis_queue() -> ember::Result<()> {
    let queue = Arc::new(AnalysisQueue::new(2, 8)?);
    let config = IndexConfig::builder().analysis_workers(2).build();
    let first = Engine::open_with_queue(config.clone(), Arc::clone(&queue))?;
    let second = Engine::open_with_queue(config, Arc::clone(&queue))?;

    first.update(Document::new_with_id("a").add_text("body", "x"))?;
    first.close()?;
    assert!(!queue.is_closed(), "a shared queue outlives its engines");

    second.update(Document::new_with_id("b").add_text("body", "y"))?;
    assert_eq!(second.reader()?.live_ids(), vec!["b"]);
    Ok(())
}
