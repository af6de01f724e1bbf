//! Offline ingestion for Docent.
//!
//! Walks a docs directory, splits every markdown/MDX file at its headings,
//! counts and embeds each section, and writes the whole run to a
//! [`SectionStore`](docent_core::SectionStore) as one atomic batch.
//! Re-running over unchanged files is a no-op thanks to content checksums.

pub mod documents;
pub mod markdown;
pub mod pipeline;

pub use documents::{SourceDocument, discover, read_all};
pub use markdown::{MarkdownSection, Slugger, split_sections};
pub use pipeline::{IngestReport, Ingestor, checksum};
