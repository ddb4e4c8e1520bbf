//! Offline indexing pass: load, chunk, embed, build

use futures::{stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{CallPolicy, CallStage, EmbeddingProvider};
use crate::retrieval::{IndexEntry, VectorIndex};
use crate::types::{Chunk, IndexReport};

use super::chunker::TextChunker;
use super::loader::DocumentLoader;

/// Rebuilds the vector index from the document tree
///
/// Only one pass runs at a time; a second caller gets
/// [`Error::IndexingInProgress`]. A pass that fails leaves the served index
/// exactly as it was.
pub struct Indexer {
    loader: Arc<DocumentLoader>,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    policy: CallPolicy,
    parallelism: usize,
    running: Mutex<()>,
}

impl Indexer {
    /// Create an indexer from configuration
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> Result<Self> {
        Ok(Self {
            loader: Arc::new(DocumentLoader::new(&config.documents.data_dir)),
            chunker: TextChunker::from_config(&config.chunking)?,
            embedder,
            index,
            policy: CallPolicy::embedding(config),
            parallelism: config.embeddings.parallelism.max(1),
            running: Mutex::new(()),
        })
    }

    /// Override the call policy used for chunk embeddings
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The index this indexer publishes to
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Run one indexing pass
    pub async fn run(&self) -> Result<IndexReport> {
        let _guard = self.running.try_lock().map_err(|_| Error::IndexingInProgress)?;
        let started = Instant::now();

        let loader = Arc::clone(&self.loader);
        let outcome = tokio::task::spawn_blocking(move || loader.load_all())
            .await
            .map_err(|e| Error::internal(format!("Document loading task failed: {}", e)))??;

        let chunks: Vec<Chunk> = outcome
            .documents
            .iter()
            .flat_map(|doc| self.chunker.chunk(doc))
            .collect();

        if chunks.is_empty() {
            tracing::warn!(
                "No chunks produced from {} (supported formats: .txt, .md, .pdf)",
                self.loader.data_dir().display()
            );
            return Err(Error::EmptyCorpus);
        }

        tracing::info!(
            "Embedding {} chunks from {} documents with {} ({} concurrent)",
            chunks.len(),
            outcome.documents.len(),
            self.embedder.name(),
            self.parallelism
        );

        let embeddings = self.embed_chunks(&chunks).await?;

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();
        let chunks_indexed = entries.len();
        let unique_sources = entries
            .iter()
            .map(|e| e.chunk.source.as_str())
            .collect::<HashSet<_>>()
            .len();

        let index = Arc::clone(&self.index);
        let summary = tokio::task::spawn_blocking(move || index.build(entries))
            .await
            .map_err(|e| Error::internal(format!("Index build task failed: {}", e)))??;

        let report = IndexReport {
            documents_loaded: outcome.documents.len(),
            skipped: outcome.skipped,
            chunks_indexed,
            unique_sources,
            generation: summary.generation,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Indexing complete: {} documents, {} chunks, {} sources, generation {} in {} ms",
            report.documents_loaded,
            report.chunks_indexed,
            report.unique_sources,
            report.generation,
            report.duration_ms
        );

        Ok(report)
    }

    /// Embed chunk contents concurrently, keeping input order
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let embedder = &self.embedder;
        let policy = &self.policy;

        // Built eagerly: a stream `map` closure over `&Chunk` is not `Send`
        let calls: Vec<_> = chunks
            .iter()
            .map(|chunk| {
                let text = chunk.content.as_str();
                policy.run(CallStage::Embedding, move || embedder.embed(text))
            })
            .collect();

        stream::iter(calls)
            .buffered(self.parallelism)
            .try_collect()
            .await
    }
}
