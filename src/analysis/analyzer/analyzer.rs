//! The analyzer trait.

use std::fmt::Debug;

use crate::analysis::token::Token;
use crate::error::Result;

/// Stream of tokens produced by an analyzer.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

/// A text analyzer.
///
/// Analyzers are shared across analysis workers, so implementations must be
/// thread-safe and must not keep per-call state.
pub trait Analyzer: Send + Sync + Debug {
    /// Split `text` into tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Name used in logs and debug output.
    fn name(&self) -> &'static str;
}
