//! Analyzer that keeps the whole input as a single token.

use crate::analysis::analyzer::analyzer::{Analyzer, TokenStream};
use crate::analysis::token::Token;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        KeywordAnalyzer
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let token = Token::new(text, 0, 0, text.len());
        Ok(Box::new(std::iter::once(token)))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_analyzer_single_token() {
        let tokens: Vec<Token> = KeywordAnalyzer::new()
            .analyze("New York City")
            .unwrap()
            .collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "New York City");
        assert_eq!(tokens[0].end_offset, 13);
    }
}
