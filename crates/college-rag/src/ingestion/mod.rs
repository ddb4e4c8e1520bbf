//! Document ingestion: loading, chunking and the indexing pass

pub mod chunker;
pub mod indexer;
pub mod loader;

pub use chunker::TextChunker;
pub use indexer::Indexer;
pub use loader::{DocumentLoader, LoadOutcome};
