//! Per-request question answering
//!
//! Each call to [`RagPipeline::ask`] walks a fresh request through
//! `Idle -> Embedding -> Retrieving -> PromptBuilding -> Generating` and ends
//! in `Answered` or `Failed`. Nothing is shared between requests except the
//! read-only index and the provider handles.

use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{AnswerOrchestrator, PromptBuilder};
use crate::providers::{CallPolicy, EmbeddingProvider, GenerationOptions, LlmProvider};
use crate::retrieval::{Retriever, VectorIndex};
use crate::types::query::validate_question;
use crate::types::ChatAnswer;

/// Where a request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Idle,
    Embedding,
    Retrieving,
    PromptBuilding,
    Generating,
    Answered,
    Failed,
}

/// Everything known about one finished request
#[derive(Debug)]
pub struct RequestOutcome {
    /// Correlates log lines of this request
    pub request_id: Uuid,
    /// Stages visited, starting at `Idle` and ending in a terminal stage
    pub stages: Vec<RequestStage>,
    /// The answer or the error that stopped the request
    pub result: Result<ChatAnswer>,
}

impl RequestOutcome {
    /// The stage that was active when the request failed
    pub fn failed_at(&self) -> Option<RequestStage> {
        match self.stages.as_slice() {
            [.., stage, RequestStage::Failed] => Some(*stage),
            _ => None,
        }
    }
}

struct RequestState {
    stages: Vec<RequestStage>,
}

impl RequestState {
    fn new() -> Self {
        Self {
            stages: vec![RequestStage::Idle],
        }
    }

    fn stage(&self) -> RequestStage {
        self.stages.last().copied().unwrap_or(RequestStage::Idle)
    }

    fn advance(&mut self, next: RequestStage) {
        tracing::debug!(from = ?self.stage(), to = ?next, "stage");
        self.stages.push(next);
    }
}

/// Retriever plus orchestrator behind a single `ask` call
pub struct RagPipeline {
    retriever: Retriever,
    orchestrator: AnswerOrchestrator,
    top_k: usize,
}

impl RagPipeline {
    /// Start building a pipeline
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// The shared vector index
    pub fn index(&self) -> &Arc<VectorIndex> {
        self.retriever.index()
    }

    /// The language model provider
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        self.orchestrator.llm()
    }

    /// Number of chunks retrieved per question
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Probe the language model service; errors count as unavailable
    pub async fn llm_available(&self) -> bool {
        self.llm().health_check().await.unwrap_or(false)
    }

    /// Answer one question
    pub async fn ask(&self, question: &str, conversation_id: Option<String>) -> Result<ChatAnswer> {
        self.process(question, conversation_id).await.result
    }

    /// Answer one question, keeping the stage trail
    pub async fn process(&self, question: &str, conversation_id: Option<String>) -> RequestOutcome {
        let request_id = Uuid::new_v4();

        if let Err(e) = validate_question(question) {
            return RequestOutcome {
                request_id,
                stages: vec![RequestStage::Idle, RequestStage::Failed],
                result: Err(e),
            };
        }

        let span = tracing::info_span!("chat", %request_id);
        async move {
            let mut state = RequestState::new();
            let result = self.run(&mut state, question, conversation_id).await;

            match &result {
                Ok(answer) => {
                    state.advance(RequestStage::Answered);
                    tracing::info!(sources = answer.sources.len(), "Question answered");
                }
                Err(e) => {
                    tracing::warn!(stage = ?state.stage(), kind = e.kind(), "Request failed: {}", e);
                    state.advance(RequestStage::Failed);
                }
            }

            RequestOutcome {
                request_id,
                stages: state.stages,
                result,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        state: &mut RequestState,
        question: &str,
        conversation_id: Option<String>,
    ) -> Result<ChatAnswer> {
        if !self.index().is_initialized() {
            return Err(Error::NotInitialized);
        }

        state.advance(RequestStage::Embedding);
        let embedding = self.retriever.embed_question(question).await?;

        state.advance(RequestStage::Retrieving);
        let retrieved = self.retriever.search(embedding, self.top_k).await?;

        state.advance(RequestStage::PromptBuilding);
        let prompt = self.orchestrator.build_prompt(question, &retrieved);
        let sources = self.orchestrator.collect_sources(&retrieved);

        state.advance(RequestStage::Generating);
        self.orchestrator
            .complete(&prompt, sources, conversation_id)
            .await
    }
}

/// Builder for [`RagPipeline`]
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    llm: Option<Arc<dyn LlmProvider>>,
    index: Option<Arc<VectorIndex>>,
    prompts: Option<PromptBuilder>,
}

impl RagPipelineBuilder {
    /// Use `config` (validated on build); defaults otherwise
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Embedding provider (required)
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Language model provider (required)
    pub fn llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Share an already opened index; otherwise it is opened from the config
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Override the prompt builder; otherwise the configured prompt file is read
    pub fn prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Validate and assemble the pipeline
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedder = self
            .embedder
            .ok_or_else(|| Error::config("RagPipeline requires an embedding provider"))?;
        let llm = self
            .llm
            .ok_or_else(|| Error::config("RagPipeline requires an LLM provider"))?;

        if embedder.dimensions() != config.embeddings.dimensions {
            return Err(Error::DimensionMismatch {
                expected: config.embeddings.dimensions,
                actual: embedder.dimensions(),
            });
        }

        let index = match self.index {
            Some(index) => index,
            None => Arc::new(VectorIndex::open(
                config.vector_db.index_path(),
                config.embeddings.dimensions,
                config.embeddings.model.clone(),
            )?),
        };
        if index.dimensions() != config.embeddings.dimensions {
            return Err(Error::DimensionMismatch {
                expected: config.embeddings.dimensions,
                actual: index.dimensions(),
            });
        }

        let prompts = self
            .prompts
            .unwrap_or_else(|| PromptBuilder::load(config.documents.system_prompt_path.as_deref()));

        let retriever = Retriever::new(embedder, index, CallPolicy::embedding(&config))
        .with_min_relevance(config.retrieval.min_relevance);

        let orchestrator = AnswerOrchestrator::new(
            llm,
            prompts,
            GenerationOptions::from(&config.llm),
            CallPolicy::generation(&config),
        )
        .with_excerpt_chars(config.retrieval.excerpt_chars);

        Ok(RagPipeline {
            retriever,
            orchestrator,
            top_k: config.retrieval.top_k,
        })
    }
}
