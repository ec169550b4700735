//! Process-wide engine counters.
//!
//! Counters are plain atomics updated from any batch or from the
//! introducer thread. A [`StatsSnapshot`] is a point-in-time copy; there is
//! no ordering guarantee between individual counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::snapshot::IntroduceReport;

#[derive(Debug, Default)]
pub struct Stats {
    batches: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    internal_sets: AtomicU64,
    internal_deletes: AtomicU64,
    analysis_time_ns: AtomicU64,
    analysis_failures: AtomicU64,
    plain_text_bytes_indexed: AtomicU64,
    batch_errors: AtomicU64,
    introductions_applied: AtomicU64,
    introductions_rejected: AtomicU64,
    introductions_abandoned: AtomicU64,
    introduction_time_ns: AtomicU64,
    obsoletes_recomputed: AtomicU64,
    docs_obsoleted: AtomicU64,
    root_version: AtomicU64,
}

fn nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

impl Stats {
    pub(crate) fn record_batch(
        &self,
        updates: usize,
        deletes: usize,
        internal_sets: usize,
        internal_deletes: usize,
    ) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.updates.fetch_add(updates as u64, Ordering::Relaxed);
        self.deletes.fetch_add(deletes as u64, Ordering::Relaxed);
        self.internal_sets
            .fetch_add(internal_sets as u64, Ordering::Relaxed);
        self.internal_deletes
            .fetch_add(internal_deletes as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_analysis_time(&self, elapsed: Duration) {
        self.analysis_time_ns
            .fetch_add(nanos(elapsed), Ordering::Relaxed);
    }

    pub(crate) fn add_analysis_failures(&self, count: usize) {
        self.analysis_failures
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_plain_text_bytes(&self, bytes: u64) {
        self.plain_text_bytes_indexed
            .fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn incr_batch_errors(&self) {
        self.batch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_introductions_rejected(&self) {
        self.introductions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn incr_introductions_abandoned(&self) {
        self.introductions_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_introduction(
        &self,
        elapsed: Duration,
        report: &IntroduceReport,
        version: u64,
    ) {
        self.introductions_applied.fetch_add(1, Ordering::Relaxed);
        self.introduction_time_ns
            .fetch_add(nanos(elapsed), Ordering::Relaxed);
        self.obsoletes_recomputed
            .fetch_add(report.obsoletes_recomputed as u64, Ordering::Relaxed);
        self.docs_obsoleted
            .fetch_add(report.docs_obsoleted, Ordering::Relaxed);
        self.root_version.fetch_max(version, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            batches: load(&self.batches),
            updates: load(&self.updates),
            deletes: load(&self.deletes),
            internal_sets: load(&self.internal_sets),
            internal_deletes: load(&self.internal_deletes),
            analysis_time_ns: load(&self.analysis_time_ns),
            analysis_failures: load(&self.analysis_failures),
            plain_text_bytes_indexed: load(&self.plain_text_bytes_indexed),
            batch_errors: load(&self.batch_errors),
            introductions_applied: load(&self.introductions_applied),
            introductions_rejected: load(&self.introductions_rejected),
            introductions_abandoned: load(&self.introductions_abandoned),
            introduction_time_ns: load(&self.introduction_time_ns),
            obsoletes_recomputed: load(&self.obsoletes_recomputed),
            docs_obsoleted: load(&self.docs_obsoleted),
            root_version: load(&self.root_version),
        }
    }
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub updates: u64,
    pub deletes: u64,
    pub internal_sets: u64,
    pub internal_deletes: u64,
    /// Cumulative wall time spent waiting for document analysis.
    pub analysis_time_ns: u64,
    pub analysis_failures: u64,
    pub plain_text_bytes_indexed: u64,
    /// Batches that returned an error.
    pub batch_errors: u64,
    pub introductions_applied: u64,
    pub introductions_rejected: u64,
    /// Introductions whose submitter timed out before they were applied.
    pub introductions_abandoned: u64,
    pub introduction_time_ns: u64,
    /// Segments whose obsoletes were computed inside the introducer.
    pub obsoletes_recomputed: u64,
    pub docs_obsoleted: u64,
    pub root_version: u64,
}

impl StatsSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Flat key/value view, keyed by the JSON field names.
    pub fn to_map(&self) -> HashMap<String, u64> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(fields)) => fields
                .into_iter()
                .filter_map(|(name, value)| value.as_u64().map(|v| (name, v)))
                .collect(),
            _ => HashMap::new(),
        }
    }
}
