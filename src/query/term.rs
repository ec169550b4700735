use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};
use crate::index::reader::IndexReader;
use crate::query::{DocumentMatch, Query, default_boost};

/// Exact match of one term in one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermQuery {
    pub field: String,
    pub term: String,
    #[serde(default = "default_boost")]
    pub boost: f64,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, term: impl Into<String>) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: default_boost(),
        }
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(EmberError::invalid_argument("term query must specify a field"));
        }
        Ok(())
    }

    fn search(&self, reader: &IndexReader) -> Result<Vec<DocumentMatch>> {
        self.validate()?;
        let mut matches: Vec<DocumentMatch> = reader
            .term_matches(&self.field, &self.term)
            .into_iter()
            .map(|m| DocumentMatch {
                id: m.id,
                score: self.boost,
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }
}
