//! Vector index and retrieval

pub mod index;
pub mod retriever;

pub use index::{BuildSummary, IndexEntry, IndexStats, Neighbor, VectorIndex};
pub use retriever::{relevance_from_similarity, RetrievalResult, Retriever, ScoredChunk};
