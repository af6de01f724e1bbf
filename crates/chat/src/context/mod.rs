//! Context assembly: token estimation and budgeted concatenation of
//! retrieved sections and conversation turns.

pub mod assembler;
pub mod token;

pub use assembler::{AssembledContext, AssemblyStats, ContextAssembler, TokenBudget};
pub use token::{HeuristicTokenizer, estimate_tokens};
