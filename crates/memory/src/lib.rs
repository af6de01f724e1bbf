//! Retrieval storage for Docent: the ranking engine, the in-process
//! conversation log, and the document section stores.

pub mod conversation;
pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use conversation::ConversationStore;
pub use in_memory::InMemorySectionStore;
pub use vector::rank;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSectionStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSectionStore;
