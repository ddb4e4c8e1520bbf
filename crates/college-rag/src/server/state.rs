//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::Indexer;
use crate::pipeline::RagPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Question answering pipeline
    pipeline: RagPipeline,
    /// Re-indexing pass, publishing into the pipeline's index
    indexer: Indexer,
}

impl AppState {
    /// Create state backed by the configured Ollama server
    pub fn new(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = OllamaProvider::new(&config)?.split();
        tracing::info!(
            "Ollama providers ready at {} (embeddings: {}, generation: {})",
            config.llm.base_url,
            config.embeddings.model,
            config.llm.generate_model
        );
        Self::with_providers(config, Arc::new(embedder), Arc::new(llm))
    }

    /// Create state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let pipeline = RagPipeline::builder()
            .config(config.clone())
            .embedder(Arc::clone(&embedder))
            .llm(llm)
            .build()?;

        let indexer = Indexer::new(&config, embedder, Arc::clone(pipeline.index()))?;

        if pipeline.index().is_initialized() {
            tracing::info!("Vector index ready with {} chunks", pipeline.index().size());
        } else {
            tracing::warn!("Vector index not initialized; POST /index or run college-rag-index");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                indexer,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the question answering pipeline
    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Get the indexer
    pub fn indexer(&self) -> &Indexer {
        &self.inner.indexer
    }

    /// Whether questions can be answered
    pub fn is_ready(&self) -> bool {
        self.inner.pipeline.index().is_initialized()
    }
}
