//! Tokenizer trait used for context budgeting.

/// Counts model tokens in a piece of text.
///
/// Counting is synchronous and must be cheap: the context assembler calls it
/// once per candidate on the request path.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}
