//! Question to ranked chunks

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{CallPolicy, CallStage, EmbeddingProvider};
use crate::types::Chunk;

use super::index::VectorIndex;

/// A chunk with its normalised relevance
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Retrieved chunk
    pub chunk: Chunk,
    /// Relevance in [0, 1]
    pub relevance: f32,
}

/// Chunks retrieved for one question, most relevant first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    /// Ranked chunks
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of retrieved chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Map cosine similarity onto [0, 1]: `(1 + cos) / 2`, i.e. `1 - distance / 2`
pub fn relevance_from_similarity(similarity: f32) -> f32 {
    ((1.0 + similarity) / 2.0).clamp(0.0, 1.0)
}

/// Embeds questions and ranks index entries against them
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    policy: CallPolicy,
    min_relevance: f32,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            embedder,
            index,
            policy,
            min_relevance: 0.0,
        }
    }

    /// Drop results whose relevance falls below `min_relevance`
    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    /// The index this retriever reads
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Embed `question` through the call policy
    pub async fn embed_question(&self, question: &str) -> Result<Vec<f32>> {
        let embedder = &self.embedder;
        self.policy
            .run(CallStage::Embedding, move || embedder.embed(question))
            .await
    }

    /// Embed `question` and return its `top_k` nearest chunks
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(Error::config("top_k must be greater than zero"));
        }
        if !self.index.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let embedding = self.embed_question(question).await?;
        self.search(embedding, top_k).await
    }

    /// Rank index entries against an already computed question embedding
    pub async fn search(&self, embedding: Vec<f32>, top_k: usize) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(Error::config("top_k must be greater than zero"));
        }

        let index = Arc::clone(&self.index);
        let neighbors = tokio::task::spawn_blocking(move || index.query(&embedding, top_k))
            .await
            .map_err(|e| Error::internal(format!("Index query task failed: {}", e)))??;

        let chunks: Vec<ScoredChunk> = neighbors
            .into_iter()
            .map(|n| ScoredChunk {
                relevance: relevance_from_similarity(n.similarity),
                chunk: n.chunk,
            })
            .filter(|c| c.relevance >= self.min_relevance)
            .collect();

        tracing::debug!("Retrieved {} chunks (top_k = {})", chunks.len(), top_k);

        Ok(RetrievalResult { chunks })
    }
}
