//! Atomic groups of index operations.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::data::{Document, ID_FIELD};
use crate::error::{DocumentFailure, EmberError, Result};
use crate::index::segment::SegmentId;

/// Upserts, deletes and internal key/value changes committed together.
///
/// Operations are keyed by document ID; a later operation on the same ID
/// replaces an earlier one, so updating and then deleting an ID within one
/// batch leaves it deleted.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    ops: BTreeMap<String, Option<Document>>,
    internal_ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an upsert and return the document's ID, generating one when
    /// the document has none.
    pub fn update(&mut self, mut document: Document) -> String {
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        document.id = Some(id.clone());
        self.ops.insert(id.clone(), Some(document));
        id
    }

    pub fn delete(&mut self, id: impl Into<String>) {
        self.ops.insert(id.into(), None);
    }

    pub fn set_internal(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.internal_ops.insert(key.into(), Some(value.into()));
    }

    pub fn delete_internal(&mut self, key: impl Into<Vec<u8>>) {
        self.internal_ops.insert(key.into(), None);
    }

    /// Number of queued operations, internal ones included.
    pub fn size(&self) -> usize {
        self.ops.len() + self.internal_ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn reset(&mut self) {
        self.ops.clear();
        self.internal_ops.clear();
    }

    pub fn num_updates(&self) -> usize {
        self.ops.values().filter(|op| op.is_some()).count()
    }

    pub fn num_deletes(&self) -> usize {
        self.ops.values().filter(|op| op.is_none()).count()
    }

    pub fn num_internal_sets(&self) -> usize {
        self.internal_ops.values().filter(|op| op.is_some()).count()
    }

    pub fn num_internal_deletes(&self) -> usize {
        self.internal_ops.values().filter(|op| op.is_none()).count()
    }

    /// Check the batch before any work is done on it.
    pub fn validate(&self) -> Result<()> {
        for (id, op) in &self.ops {
            if id.is_empty() {
                return Err(EmberError::invalid_argument("document id must not be empty"));
            }
            let Some(document) = op else {
                continue;
            };
            if document.has_field(ID_FIELD)
                || document.composite_fields.iter().any(|c| c.name == ID_FIELD)
            {
                return Err(EmberError::invalid_argument(format!(
                    "document '{id}' uses reserved field name '{ID_FIELD}'"
                )));
            }
            for (i, composite) in document.composite_fields.iter().enumerate() {
                if document.has_field(&composite.name)
                    || document.composite_fields[..i]
                        .iter()
                        .any(|c| c.name == composite.name)
                {
                    return Err(EmberError::invalid_argument(format!(
                        "document '{id}' has composite field '{}' that collides with another field",
                        composite.name
                    )));
                }
            }
        }
        if self.internal_ops.keys().any(|k| k.is_empty()) {
            return Err(EmberError::invalid_argument("internal key must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BTreeMap<String, Option<Document>>,
        BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) {
        (self.ops, self.internal_ops)
    }
}

/// Outcome of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// Version of the first snapshot that contains the batch.
    pub version: u64,
    pub segment_id: SegmentId,
    /// Documents left out because they failed analysis. Only ever non-empty
    /// under [`AnalysisFailurePolicy::SkipDocument`](crate::AnalysisFailurePolicy::SkipDocument).
    pub failures: Vec<DocumentFailure>,
}
