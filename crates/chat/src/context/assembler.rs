//! Greedy, token-budgeted concatenation of retrieved text.
//!
//! Candidates are taken in the order given (best first). Each one is counted
//! against the [`TokenBudget`] *before* it is appended; the candidate that
//! reaches the ceiling is not appended but its tokens stay counted. One
//! budget is threaded through every pass of a request, so once the document
//! pass fills it the conversation passes append nothing.

use std::sync::Arc;

use docent_core::Tokenizer;
use serde::Serialize;

/// Separator written after every appended candidate.
pub const SEPARATOR: &str = "\n---\n";

/// Default ceiling for assembled context, in tokens.
pub const DEFAULT_TOKEN_BUDGET: usize = 1500;

/// Running token counter shared across the assembly passes of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    limit: usize,
    used: usize,
}

impl TokenBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Tokens counted so far, including any candidate that tipped the budget.
    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Count `tokens` and report whether the candidate still fits.
    fn charge(&mut self, tokens: usize) -> bool {
        self.used = self.used.saturating_add(tokens);
        self.used < self.limit
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}

/// Per-pass counters, reported in the pipeline's debug logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub included: usize,
    pub dropped: usize,
    /// Budget consumption after this pass.
    pub tokens_used: usize,
}

/// Output of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    pub stats: AssemblyStats,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Concatenates candidates until the shared budget runs out.
#[derive(Clone)]
pub struct ContextAssembler {
    tokenizer: Arc<dyn Tokenizer>,
}

impl ContextAssembler {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Run one pass over `candidates`, drawing on `budget`.
    pub fn assemble<'c, I>(&self, candidates: I, budget: &mut TokenBudget) -> AssembledContext
    where
        I: IntoIterator<Item = &'c str>,
    {
        let mut out = AssembledContext::default();
        let mut candidates = candidates.into_iter();

        for content in candidates.by_ref() {
            if !budget.charge(self.tokenizer.count_tokens(content)) {
                out.stats.dropped = 1;
                break;
            }
            out.text.push_str(content.trim());
            out.text.push_str(SEPARATOR);
            out.stats.included += 1;
        }

        out.stats.dropped += candidates.count();
        out.stats.tokens_used = budget.used();
        out
    }
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAssembler").finish_non_exhaustive()
    }
}
