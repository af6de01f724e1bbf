//! Process-wide conversation log.
//!
//! Turns are kept newest first and never mutated once recorded. Readers take
//! an immutable snapshot; writers prepend a whole exchange under one lock so
//! two concurrent exchanges can never interleave their turns.

use std::sync::{Arc, RwLock};

use docent_core::ConversationTurn;
use tracing::debug;

/// Shared, append-only (prepend-only) log of conversation turns.
///
/// The log lives for the lifetime of the process; nothing is persisted.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: RwLock<Arc<Vec<ConversationTurn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current turns, newest first.
    ///
    /// The returned `Arc` is a frozen view: exchanges recorded afterwards do
    /// not show up in it.
    pub fn snapshot(&self) -> Arc<Vec<ConversationTurn>> {
        let guard = self.turns.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Prepend one completed exchange so the log reads
    /// `[query, answer, ...older]`.
    pub fn record_exchange(&self, query: ConversationTurn, answer: ConversationTurn) {
        let mut guard = self.turns.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Vec::with_capacity(guard.len() + 2);
        next.push(query);
        next.push(answer);
        next.extend(guard.iter().cloned());
        *guard = Arc::new(next);
        debug!(turns = guard.len(), "Conversation store updated");
    }

    pub fn len(&self) -> usize {
        self.turns.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
