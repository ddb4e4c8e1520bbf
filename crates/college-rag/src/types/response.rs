//! Response types for chat answers and indexing runs

use serde::{Deserialize, Serialize};

/// A source document cited by an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Document path
    pub source: String,
    /// Excerpt of the highest-ranked chunk from this document
    pub content: String,
    /// Relevance of that chunk, in [0, 1]
    pub relevance_score: f32,
}

/// Answer to one question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatAnswer {
    /// Generated answer text
    pub answer: String,
    /// Deduplicated sources, most relevant first
    pub sources: Vec<SourceRef>,
    /// Echo of the request's conversation id
    pub conversation_id: Option<String>,
}

/// A file the loader could not use
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedDocument {
    /// Path of the file
    pub path: String,
    /// Why it was skipped
    pub reason: String,
}

/// Outcome of an indexing pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents loaded successfully
    pub documents_loaded: usize,
    /// Files that failed to load
    pub skipped: Vec<SkippedDocument>,
    /// Chunks embedded and stored
    pub chunks_indexed: usize,
    /// Distinct source paths in the new index
    pub unique_sources: usize,
    /// Generation number of the published index
    pub generation: u64,
    /// Wall-clock duration of the pass
    pub duration_ms: u64,
}
