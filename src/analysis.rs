//! Text analysis capability consumed by the indexing pipeline.
//!
//! ```text
//! Text → Analyzer → Token Stream → Token Frequencies
//! ```
//!
//! # Examples
//!
//! ```
//! use ember::analysis::analyzer::standard::StandardAnalyzer;
//! use ember::analysis::analyzer::analyzer::Analyzer;
//!
//! let analyzer = StandardAnalyzer::new();
//! let tokens: Vec<_> = analyzer.analyze("Hello World!").unwrap().collect();
//! assert_eq!(tokens[0].text, "hello");
//! assert_eq!(tokens[1].text, "world");
//! ```

pub mod analyzer;
pub mod token;

pub use analyzer::analyzer::Analyzer;
pub use analyzer::keyword::KeywordAnalyzer;
pub use analyzer::per_field::PerFieldAnalyzer;
pub use analyzer::standard::StandardAnalyzer;
pub use token::{Token, TokenFreq, TokenFrequencies, TokenLocation};
