//! Token estimation.
//!
//! Uses a character-based heuristic: ~4 characters per token. Close enough
//! for BPE tokenizers on English prose; enable the `local` feature of
//! `docent-providers` for exact counts.

use docent_core::Tokenizer;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters (bytes). Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// [`Tokenizer`] backed by [`estimate_tokens`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}
