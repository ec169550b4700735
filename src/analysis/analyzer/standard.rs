//! Unicode word analyzer.

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::analyzer::analyzer::{Analyzer, TokenStream};
use crate::analysis::token::Token;
use crate::error::Result;

/// Splits text on Unicode word boundaries (UAX #29) and lowercases each word.
#[derive(Debug, Clone, Default)]
pub struct StandardAnalyzer {
    max_token_length: Option<usize>,
}

impl StandardAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop words longer than `len` bytes.
    pub fn with_max_token_length(mut self, len: usize) -> Self {
        self.max_token_length = Some(len);
        self
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let max = self.max_token_length;
        let tokens: Vec<Token> = text
            .unicode_word_indices()
            .filter(|(_, word)| max.is_none_or(|m| word.len() <= m))
            .enumerate()
            .map(|(position, (start, word))| {
                Token::new(word.to_lowercase(), position, start, start + word.len())
            })
            .collect();
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}
