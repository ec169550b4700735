//! Per-document analysis.
//!
//! Every indexed field is reduced to a [`TokenFrequencies`] summary and a
//! length. Composite fields are built afterwards from the summaries of the
//! plain fields they subsume, so a document's result is only final once
//! every plain field has been analyzed.

use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::analysis::token::{Token, TokenFrequencies};
use crate::data::{CompositeField, DataValue, Document, Field};
use crate::error::{EmberError, Result};

/// Analysis output for one document.
///
/// `analyzed` and `lengths` hold one slot per plain field (in document
/// order) followed by one slot per composite field.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub doc_id: String,
    pub document: Document,
    pub analyzed: Vec<TokenFrequencies>,
    pub lengths: Vec<usize>,
}

impl AnalysisResult {
    /// Field name for the given slot.
    pub fn field_name(&self, slot: usize) -> Option<&str> {
        let plain = self.document.fields.len();
        if slot < plain {
            Some(self.document.fields[slot].name.as_str())
        } else {
            self.document
                .composite_fields
                .get(slot - plain)
                .map(|c| c.name.as_str())
        }
    }

    /// Iterate over `(field name, frequencies, length)` for every slot.
    pub fn slots(&self) -> impl Iterator<Item = (&str, &TokenFrequencies, usize)> {
        (0..self.analyzed.len()).filter_map(move |slot| {
            self.field_name(slot)
                .map(|name| (name, &self.analyzed[slot], self.lengths[slot]))
        })
    }
}

/// Accumulates the contributions of plain fields into one composite field.
#[derive(Debug)]
struct CompositeAccumulator<'a> {
    field: &'a CompositeField,
    frequencies: TokenFrequencies,
    length: usize,
}

impl<'a> CompositeAccumulator<'a> {
    fn new(field: &'a CompositeField) -> Self {
        CompositeAccumulator {
            field,
            frequencies: TokenFrequencies::new(),
            length: 0,
        }
    }

    fn compose(&mut self, source: &Field, length: usize, frequencies: &TokenFrequencies) {
        if !source.option.include_in_composites || !self.field.includes_field(&source.name) {
            return;
        }
        self.length += length;
        self.frequencies.merge_all(&source.name, frequencies);
    }
}

/// Analyze a document whose ID has already been assigned.
pub fn analyze_document(
    document: Document,
    analyzer: &PerFieldAnalyzer,
    store_locations: bool,
) -> Result<AnalysisResult> {
    let doc_id = document
        .id
        .clone()
        .ok_or_else(|| EmberError::invalid_argument("document has no id"))?;

    let slots = document.fields.len() + document.composite_fields.len();
    let mut analyzed = Vec::with_capacity(slots);
    let mut lengths = Vec::with_capacity(slots);
    let mut composites: Vec<CompositeAccumulator<'_>> = document
        .composite_fields
        .iter()
        .map(CompositeAccumulator::new)
        .collect();

    for field in &document.fields {
        if !field.option.indexed {
            analyzed.push(TokenFrequencies::new());
            lengths.push(0);
            continue;
        }

        let tokens = field_tokens(field, analyzer).map_err(|e| {
            let reason = match e {
                EmberError::Analysis(msg) => msg,
                other => other.to_string(),
            };
            EmberError::analysis(format!("field '{}': {reason}", field.name))
        })?;
        let length = tokens.len();
        let frequencies = TokenFrequencies::from_tokens(tokens, store_locations);

        for composite in composites.iter_mut() {
            composite.compose(field, length, &frequencies);
        }

        analyzed.push(frequencies);
        lengths.push(length);
    }

    for composite in composites {
        analyzed.push(composite.frequencies);
        lengths.push(composite.length);
    }

    Ok(AnalysisResult {
        doc_id,
        document,
        analyzed,
        lengths,
    })
}

fn single(term: String) -> Vec<Token> {
    let len = term.len();
    vec![Token::new(term, 0, 0, len)]
}

fn field_tokens(field: &Field, analyzer: &PerFieldAnalyzer) -> Result<Vec<Token>> {
    match &field.value {
        DataValue::Text(text) => Ok(analyzer.analyze_field(&field.name, text)?.collect()),
        DataValue::String(s) => Ok(single(s.clone())),
        DataValue::Int64(i) => Ok(single(i.to_string())),
        DataValue::Float64(f) if f.is_finite() => Ok(single(f.to_string())),
        DataValue::Float64(f) => Err(EmberError::analysis(format!(
            "non-finite numeric value {f}"
        ))),
        DataValue::Bool(b) => Ok(single(b.to_string())),
        DataValue::DateTime(dt) => Ok(single(dt.to_rfc3339())),
        DataValue::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|s| single(s.to_string()))
            .map_err(|e| EmberError::analysis(format!("binary value is not valid UTF-8: {e}"))),
        DataValue::Null => Err(EmberError::analysis("null value cannot be indexed")),
    }
}
