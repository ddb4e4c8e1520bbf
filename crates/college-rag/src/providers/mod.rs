//! Provider abstractions for embeddings and text generation
//!
//! The pipeline only sees the traits; Ollama is the shipped backend and tests
//! substitute in-process implementations.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod retry;

pub use embedding::EmbeddingProvider;
pub use llm::{GenerationOptions, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use retry::{CallPolicy, CallStage};
