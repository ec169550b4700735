//! Per-field analyzer selection.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::analyzer::{Analyzer, TokenStream};
use crate::analysis::analyzer::keyword::KeywordAnalyzer;
use crate::data::ID_FIELD;
use crate::error::Result;

/// Routes each field to its own analyzer, falling back to a default.
///
/// The identity field is always keyword-analyzed so that external IDs map
/// back to exactly one term.
#[derive(Debug, Clone)]
pub struct PerFieldAnalyzer {
    default_analyzer: Arc<dyn Analyzer>,
    field_analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    pub fn new(default_analyzer: Arc<dyn Analyzer>) -> Self {
        let mut field_analyzers: AHashMap<String, Arc<dyn Analyzer>> = AHashMap::new();
        field_analyzers.insert(ID_FIELD.to_string(), Arc::new(KeywordAnalyzer::new()));
        PerFieldAnalyzer {
            default_analyzer,
            field_analyzers,
        }
    }

    /// Override the analyzer for one field. The identity field cannot be
    /// overridden.
    pub fn add_analyzer(&mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        let field = field.into();
        if field == ID_FIELD {
            log::warn!("ignoring analyzer override for reserved field '{ID_FIELD}'");
            return;
        }
        self.field_analyzers.insert(field, analyzer);
    }

    pub fn get_analyzer(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.field_analyzers
            .get(field)
            .unwrap_or(&self.default_analyzer)
    }

    pub fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.get_analyzer(field).analyze(text)
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.default_analyzer.analyze(text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }
}
