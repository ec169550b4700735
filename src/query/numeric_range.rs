use serde::{Deserialize, Serialize};

use crate::error::{EmberError, Result};
use crate::index::reader::IndexReader;
use crate::query::{DocumentMatch, Query};

/// Documents with a numeric field value inside a range.
///
/// Either bound may be open, but not both. Unless stated otherwise the
/// minimum is inclusive and the maximum exclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRangeQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_min: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive_max: Option<bool>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
}

impl NumericRangeQuery {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        NumericRangeQuery {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn new_inclusive(
        min: Option<f64>,
        max: Option<f64>,
        inclusive_min: Option<bool>,
        inclusive_max: Option<bool>,
    ) -> Self {
        NumericRangeQuery {
            min,
            max,
            inclusive_min,
            inclusive_max,
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        let above_min = match self.min {
            Some(min) if self.inclusive_min.unwrap_or(true) => value >= min,
            Some(min) => value > min,
            None => true,
        };
        let below_max = match self.max {
            Some(max) if self.inclusive_max.unwrap_or(false) => value <= max,
            Some(max) => value < max,
            None => true,
        };
        above_min && below_max
    }
}

impl Query for NumericRangeQuery {
    fn validate(&self) -> Result<()> {
        if self.min.is_none() && self.max.is_none() {
            return Err(EmberError::invalid_argument(
                "numeric range query must specify min or max",
            ));
        }
        if self.field.is_empty() {
            return Err(EmberError::invalid_argument(
                "numeric range query must specify a field",
            ));
        }
        Ok(())
    }

    fn search(&self, reader: &IndexReader) -> Result<Vec<DocumentMatch>> {
        self.validate()?;
        let score = self.boost.unwrap_or(1.0);
        let mut matches = Vec::new();
        for entry in reader.segments() {
            let segment = entry.segment();
            for doc_num in entry.live_docs() {
                let Some(values) = segment.numeric_values(&self.field, doc_num) else {
                    continue;
                };
                if !values.iter().any(|v| self.contains(*v)) {
                    continue;
                }
                if let Some(id) = segment.external_id(doc_num) {
                    matches.push(DocumentMatch {
                        id: id.to_string(),
                        score,
                    });
                }
            }
        }
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }
}
