//! Tokens and per-field token frequency summaries.

use ahash::AHashMap;

/// A single token produced by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Ordinal position within the field (0-based).
    pub position: usize,
    /// Byte offset of the token start in the source text.
    pub start_offset: usize,
    /// Byte offset one past the token end.
    pub end_offset: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, position: usize, start: usize, end: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: start,
            end_offset: end,
        }
    }
}

/// Where a term occurred.
///
/// `field` is `None` for occurrences in the field being summarised and names
/// the source field for occurrences merged into a composite field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocation {
    pub field: Option<String>,
    pub position: usize,
    pub start: usize,
    pub end: usize,
}

/// Frequency information for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFreq {
    pub term: String,
    pub locations: Vec<TokenLocation>,
    count: usize,
}

impl TokenFreq {
    pub fn frequency(&self) -> usize {
        self.count
    }
}

/// Term → frequency summary for one field of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFrequencies {
    terms: AHashMap<String, TokenFreq>,
}

impl TokenFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summarise a token stream. Locations are only kept when requested.
    pub fn from_tokens<I>(tokens: I, include_locations: bool) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let mut rv = TokenFrequencies::new();
        for token in tokens {
            let location = include_locations.then(|| TokenLocation {
                field: None,
                position: token.position,
                start: token.start_offset,
                end: token.end_offset,
            });
            rv.add(token.text, location);
        }
        rv
    }

    fn add(&mut self, term: String, location: Option<TokenLocation>) {
        let entry = self.terms.entry(term.clone()).or_insert_with(|| TokenFreq {
            term,
            locations: Vec::new(),
            count: 0,
        });
        entry.count += 1;
        if let Some(location) = location {
            entry.locations.push(location);
        }
    }

    /// Fold another field's frequencies into this one, tagging each merged
    /// location with the originating field name.
    pub fn merge_all(&mut self, field: &str, other: &TokenFrequencies) {
        self.merge_from(Some(field), other);
    }

    /// Fold another value of the same field into this one.
    pub fn merge(&mut self, other: &TokenFrequencies) {
        self.merge_from(None, other);
    }

    fn merge_from(&mut self, field: Option<&str>, other: &TokenFrequencies) {
        for (term, freq) in &other.terms {
            let entry = self.terms.entry(term.clone()).or_insert_with(|| TokenFreq {
                term: term.clone(),
                locations: Vec::new(),
                count: 0,
            });
            entry.count += freq.count;
            entry
                .locations
                .extend(freq.locations.iter().map(|loc| match field {
                    Some(field) => TokenLocation {
                        field: Some(field.to_string()),
                        ..loc.clone()
                    },
                    None => loc.clone(),
                }));
        }
    }

    pub fn get(&self, term: &str) -> Option<&TokenFreq> {
        self.terms.get(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenFreq> {
        self.terms.values()
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
