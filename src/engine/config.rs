use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::analysis::analyzer::standard::StandardAnalyzer;
use crate::error::{EmberError, Result};

/// What a batch does when some of its documents fail analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFailurePolicy {
    /// Fail the whole batch; nothing becomes visible.
    #[default]
    Reject,
    /// Commit the rest of the batch and report the failed documents.
    /// A skipped document's previous version stays visible.
    SkipDocument,
}

fn default_analysis_workers() -> usize {
    num_cpus::get().max(1)
}

fn default_analysis_queue_capacity() -> usize {
    default_analysis_workers() * 16
}

fn default_store_term_locations() -> bool {
    true
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of analysis worker threads.
    #[serde(default = "default_analysis_workers")]
    pub analysis_workers: usize,
    /// Maximum number of documents waiting for a worker.
    #[serde(default = "default_analysis_queue_capacity")]
    pub analysis_queue_capacity: usize,
    /// Deadline for a batch waiting on its introduction. None waits forever.
    #[serde(default)]
    pub introduction_timeout_ms: Option<u64>,
    #[serde(default)]
    pub analysis_failure_policy: AnalysisFailurePolicy,
    /// Record token positions and offsets in postings.
    #[serde(default = "default_store_term_locations")]
    pub store_term_locations: bool,
    /// Analyzer for text fields without their own (standard if None).
    #[serde(skip)]
    pub analyzer: Option<Arc<dyn Analyzer>>,
    #[serde(skip)]
    pub field_analyzers: HashMap<String, Arc<dyn Analyzer>>,
}

impl IndexConfig {
    pub fn new() -> Self {
        Self {
            analysis_workers: default_analysis_workers(),
            analysis_queue_capacity: default_analysis_queue_capacity(),
            introduction_timeout_ms: None,
            analysis_failure_policy: AnalysisFailurePolicy::default(),
            store_term_locations: default_store_term_locations(),
            analyzer: None,
            field_analyzers: HashMap::new(),
        }
    }

    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Load the serializable part of the configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis_workers == 0 {
            return Err(EmberError::invalid_config(
                "analysis_workers must be at least 1",
            ));
        }
        if self.analysis_queue_capacity == 0 {
            return Err(EmberError::invalid_config(
                "analysis_queue_capacity must be at least 1",
            ));
        }
        if self.introduction_timeout_ms == Some(0) {
            return Err(EmberError::invalid_config(
                "introduction_timeout_ms must be positive when set",
            ));
        }
        Ok(())
    }

    pub fn introduction_timeout(&self) -> Option<Duration> {
        self.introduction_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn build_analyzer(&self) -> PerFieldAnalyzer {
        let default = self
            .analyzer
            .clone()
            .unwrap_or_else(|| Arc::new(StandardAnalyzer::new()));
        let mut analyzer = PerFieldAnalyzer::new(default);
        for (field, field_analyzer) in &self.field_analyzers {
            analyzer.add_analyzer(field.clone(), Arc::clone(field_analyzer));
        }
        analyzer
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct IndexConfigBuilder {
    analysis_workers: Option<usize>,
    analysis_queue_capacity: Option<usize>,
    introduction_timeout_ms: Option<u64>,
    analysis_failure_policy: AnalysisFailurePolicy,
    store_term_locations: Option<bool>,
    analyzer: Option<Arc<dyn Analyzer>>,
    field_analyzers: HashMap<String, Arc<dyn Analyzer>>,
}

impl IndexConfigBuilder {
    pub fn analysis_workers(mut self, workers: usize) -> Self {
        self.analysis_workers = Some(workers);
        self
    }

    pub fn analysis_queue_capacity(mut self, capacity: usize) -> Self {
        self.analysis_queue_capacity = Some(capacity);
        self
    }

    pub fn introduction_timeout(mut self, timeout: Duration) -> Self {
        self.introduction_timeout_ms = Some(timeout.as_millis().max(1) as u64);
        self
    }

    pub fn analysis_failure_policy(mut self, policy: AnalysisFailurePolicy) -> Self {
        self.analysis_failure_policy = policy;
        self
    }

    pub fn store_term_locations(mut self, store: bool) -> Self {
        self.store_term_locations = Some(store);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn field_analyzer(mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) -> Self {
        self.field_analyzers.insert(field.into(), analyzer);
        self
    }

    pub fn build(self) -> IndexConfig {
        let workers = self
            .analysis_workers
            .unwrap_or_else(default_analysis_workers);
        IndexConfig {
            analysis_workers: workers,
            analysis_queue_capacity: self
                .analysis_queue_capacity
                .unwrap_or_else(|| workers.max(1) * 16),
            introduction_timeout_ms: self.introduction_timeout_ms,
            analysis_failure_policy: self.analysis_failure_policy,
            store_term_locations: self
                .store_term_locations
                .unwrap_or_else(default_store_term_locations),
            analyzer: self.analyzer,
            field_analyzers: self.field_analyzers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::keyword::KeywordAnalyzer;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::default();
        assert!(config.analysis_workers >= 1);
        assert!(config.analysis_queue_capacity >= config.analysis_workers);
        assert_eq!(config.introduction_timeout(), None);
        assert_eq!(config.analysis_failure_policy, AnalysisFailurePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = IndexConfig::from_json(
            r#"{
                "analysis_workers": 2,
                "introduction_timeout_ms": 500,
                "analysis_failure_policy": "skip_document",
                "store_term_locations": false
            }"#,
        )
        .unwrap();

        assert_eq!(config.analysis_workers, 2);
        assert_eq!(config.introduction_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(
            config.analysis_failure_policy,
            AnalysisFailurePolicy::SkipDocument
        );
        assert!(!config.store_term_locations);
        assert!(config.analyzer.is_none());
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        let err = IndexConfig::from_json(r#"{"analysis_workers": 0}"#).unwrap_err();
        assert!(matches!(err, EmberError::InvalidConfig(_)));
        assert!(IndexConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_builder() {
        let config = IndexConfig::builder()
            .analysis_workers(3)
            .introduction_timeout(Duration::from_secs(2))
            .field_analyzer("tag", Arc::new(KeywordAnalyzer::new()))
            .build();

        assert_eq!(config.analysis_workers, 3);
        assert_eq!(config.analysis_queue_capacity, 48);
        assert_eq!(config.introduction_timeout_ms, Some(2000));

        let analyzer = config.build_analyzer();
        assert_eq!(analyzer.get_analyzer("tag").name(), "keyword");
        assert_eq!(analyzer.get_analyzer("body").name(), "standard");
    }
}
