//! Analyzers turn a field's text into a token stream.

#[allow(clippy::module_inception)]
pub mod analyzer;
pub mod keyword;
pub mod per_field;
pub mod standard;
