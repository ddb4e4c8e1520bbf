//! Turns a retrieved context and a question into a cited answer

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::{CallPolicy, CallStage, GenerationOptions, LlmProvider};
use crate::retrieval::RetrievalResult;
use crate::types::{ChatAnswer, SourceRef};

use super::prompt::PromptBuilder;

/// Default excerpt length for returned sources
pub const DEFAULT_EXCERPT_CHARS: usize = 300;

/// Builds the prompt, calls the model and attaches sources
pub struct AnswerOrchestrator {
    llm: Arc<dyn LlmProvider>,
    prompts: PromptBuilder,
    options: GenerationOptions,
    policy: CallPolicy,
    excerpt_chars: usize,
}

impl AnswerOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        prompts: PromptBuilder,
        options: GenerationOptions,
        policy: CallPolicy,
    ) -> Self {
        Self {
            llm,
            prompts,
            options,
            policy,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }

    /// Override the excerpt length
    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// The language model in use
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Build the prompt for `question`
    pub fn build_prompt(&self, question: &str, retrieved: &RetrievalResult) -> String {
        self.prompts.build(question, retrieved)
    }

    /// One source per document, in retrieval order, so each keeps the
    /// excerpt and score of its most relevant chunk
    pub fn collect_sources(&self, retrieved: &RetrievalResult) -> Vec<SourceRef> {
        let mut seen = HashSet::new();
        retrieved
            .chunks
            .iter()
            .filter(|scored| seen.insert(scored.chunk.source.as_str()))
            .map(|scored| SourceRef {
                source: scored.chunk.source.clone(),
                content: scored.chunk.excerpt(self.excerpt_chars),
                relevance_score: scored.relevance,
            })
            .collect()
    }

    /// Call the model under the call policy
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let llm = &self.llm;
        let options = &self.options;
        let text = self
            .policy
            .run(CallStage::Generation, move || llm.generate(prompt, options))
            .await?;
        Ok(text.trim().to_string())
    }

    /// Answer `question` from `retrieved`
    ///
    /// An empty retrieval still reaches the model, with the no-documents
    /// marker in place of the context, and yields an answer with no sources.
    pub async fn answer(
        &self,
        question: &str,
        retrieved: &RetrievalResult,
        conversation_id: Option<String>,
    ) -> Result<ChatAnswer> {
        let sources = self.collect_sources(retrieved);
        let prompt = self.build_prompt(question, retrieved);
        self.complete(&prompt, sources, conversation_id).await
    }

    /// Generate from an already built prompt and wrap the reply with `sources`
    pub async fn complete(
        &self,
        prompt: &str,
        sources: Vec<SourceRef>,
        conversation_id: Option<String>,
    ) -> Result<ChatAnswer> {
        let answer = match self.generate(prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                let paths: Vec<&str> = sources.iter().map(|s| s.source.as_str()).collect();
                tracing::warn!(
                    model = self.llm.model(),
                    "Generation failed with {} sources retrieved {:?}: {}",
                    sources.len(),
                    paths,
                    e
                );
                return Err(e);
            }
        };

        Ok(ChatAnswer {
            answer,
            sources,
            conversation_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::retrieval::ScoredChunk;
    use crate::types::Chunk;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records prompts and replies with a fixed answer
    struct RecordingLlm {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| Error::generation("connection refused"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(self.reply.is_some())
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    fn scored(source: &str, content: &str, relevance: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                content: content.to_string(),
                source: source.to_string(),
                chunk_index: 0,
                char_start: 0,
                char_end: content.chars().count(),
            },
            relevance,
        }
    }

    fn orchestrator(llm: Arc<RecordingLlm>) -> AnswerOrchestrator {
        AnswerOrchestrator::new(
            llm,
            PromptBuilder::new("SYSTEM"),
            GenerationOptions {
                temperature: 0.3,
                max_tokens: 64,
            },
            CallPolicy::new(Duration::from_secs(1), 1).with_backoff(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_answer_is_trimmed_and_sources_deduplicated() {
        let llm = Arc::new(RecordingLlm::replying("  Fees are 1,20,000.\n"));
        let retrieved = RetrievalResult {
            chunks: vec![
                scored("data/fees.txt", "B.Tech fees", 0.9),
                scored("data/courses.txt", "B.Tech course", 0.8),
                scored("data/fees.txt", "Hostel fees", 0.7),
            ],
        };

        let answer = orchestrator(Arc::clone(&llm))
            .answer("What are the fees?", &retrieved, Some("conv-1".to_string()))
            .await
            .unwrap();

        assert_eq!(answer.answer, "Fees are 1,20,000.");
        assert_eq!(answer.conversation_id.as_deref(), Some("conv-1"));
        let sources: Vec<(&str, f32)> = answer
            .sources
            .iter()
            .map(|s| (s.source.as_str(), s.relevance_score))
            .collect();
        assert_eq!(sources, vec![("data/fees.txt", 0.9), ("data/courses.txt", 0.8)]);
        assert_eq!(answer.sources[0].content, "B.Tech fees");
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_calls_model() {
        let llm = Arc::new(RecordingLlm::replying("I don't have information about that."));
        let answer = orchestrator(Arc::clone(&llm))
            .answer("Who is the dean?", &RetrievalResult::default(), None)
            .await
            .unwrap();

        assert!(answer.sources.is_empty());
        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(crate::generation::NO_DOCUMENTS_MARKER));
    }

    #[tokio::test]
    async fn test_generation_failure_is_unavailable_after_one_retry() {
        let llm = Arc::new(RecordingLlm::failing());
        let retrieved = RetrievalResult {
            chunks: vec![scored("data/fees.txt", "B.Tech fees", 0.9)],
        };

        let err = orchestrator(Arc::clone(&llm))
            .answer("What are the fees?", &retrieved, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::GenerationUnavailable(_)));
        assert_eq!(llm.prompts.lock().len(), 2);
    }

    #[test]
    fn test_long_excerpts_are_truncated() {
        let llm = Arc::new(RecordingLlm::replying("ok"));
        let long = "x".repeat(450);
        let retrieved = RetrievalResult {
            chunks: vec![scored("data/long.txt", &long, 0.6)],
        };

        let sources = orchestrator(llm).collect_sources(&retrieved);
        assert_eq!(sources[0].content.len(), 303);
        assert!(sources[0].content.ends_with("..."));
    }
}
