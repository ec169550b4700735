//! In-memory segment built from one batch of analyzed documents.

use ahash::AHashMap;
use roaring::RoaringBitmap;

use crate::data::{Field, ID_FIELD};
use crate::error::{EmberError, Result};
use crate::analysis::token::TokenFrequencies;
use crate::index::analyzed::AnalysisResult;
use crate::index::segment::{DocNum, Posting, Segment};

/// An immutable in-memory segment.
///
/// Document numbers are assigned in ascending external-ID order so that a
/// batch always produces the same layout regardless of the order in which
/// analysis workers finished.
#[derive(Debug, Default)]
pub struct MemorySegment {
    doc_ids: Vec<String>,
    /// field -> term -> postings
    dictionary: AHashMap<String, AHashMap<String, Vec<Posting>>>,
    stored: Vec<Vec<Field>>,
    numeric: AHashMap<String, AHashMap<DocNum, Vec<f64>>>,
    size_in_bytes: usize,
}

impl MemorySegment {
    /// A segment holding no documents.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_analyzed(mut results: Vec<AnalysisResult>) -> Result<Self> {
        if results.len() > DocNum::MAX as usize {
            return Err(EmberError::invalid_argument(format!(
                "segment cannot hold {} documents",
                results.len()
            )));
        }
        results.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));

        let mut segment = MemorySegment::empty();
        for (num, result) in results.into_iter().enumerate() {
            segment.add(num as DocNum, result);
        }
        Ok(segment)
    }

    fn add(&mut self, doc_num: DocNum, result: AnalysisResult) {
        self.size_in_bytes += result.doc_id.len();

        // A field name may repeat within a document; each gets one posting.
        let mut fields: AHashMap<&str, (TokenFrequencies, usize)> = AHashMap::new();
        for (field, frequencies, length) in result.slots() {
            if frequencies.is_empty() {
                continue;
            }
            match fields.get_mut(field) {
                Some((merged, total)) => {
                    merged.merge(frequencies);
                    *total += length;
                }
                None => {
                    fields.insert(field, (frequencies.clone(), length));
                }
            }
        }

        for (field, (frequencies, length)) in fields {
            let terms = self.dictionary.entry(field.to_string()).or_default();
            for freq in frequencies.iter() {
                self.size_in_bytes += freq.term.len() + std::mem::size_of::<Posting>();
                terms.entry(freq.term.clone()).or_default().push(Posting {
                    doc_num,
                    frequency: freq.frequency() as u32,
                    field_length: length as u32,
                    locations: freq.locations.clone(),
                });
            }
        }

        for field in &result.document.fields {
            if !field.option.indexed {
                continue;
            }
            if let Some(value) = field.value.as_numeric() {
                self.numeric
                    .entry(field.name.clone())
                    .or_default()
                    .entry(doc_num)
                    .or_default()
                    .push(value);
            }
        }

        let stored: Vec<Field> = result
            .document
            .fields
            .into_iter()
            .filter(|f| f.option.stored)
            .collect();
        self.size_in_bytes += stored
            .iter()
            .map(|f| f.name.len() + f.value.plain_text_bytes() as usize)
            .sum::<usize>();

        self.doc_ids.push(result.doc_id);
        self.stored.push(stored);
    }
}

impl Segment for MemorySegment {
    fn doc_count(&self) -> u64 {
        self.doc_ids.len() as u64
    }

    fn doc_numbers(&self, ids: &[String]) -> RoaringBitmap {
        let mut rv = RoaringBitmap::new();
        for id in ids {
            if let Some(postings) = self.postings(ID_FIELD, id) {
                rv.extend(postings.iter().map(|p| p.doc_num));
            }
        }
        rv
    }

    fn external_id(&self, doc_num: DocNum) -> Option<&str> {
        self.doc_ids.get(doc_num as usize).map(|s| s.as_str())
    }

    fn postings(&self, field: &str, term: &str) -> Option<&[Posting]> {
        self.dictionary
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|p| p.as_slice())
    }

    fn stored_fields(&self, doc_num: DocNum) -> Option<&[Field]> {
        self.stored.get(doc_num as usize).map(|f| f.as_slice())
    }

    fn numeric_values(&self, field: &str, doc_num: DocNum) -> Option<&[f64]> {
        self.numeric
            .get(field)
            .and_then(|values| values.get(&doc_num))
            .map(|v| v.as_slice())
    }

    fn fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dictionary.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}
