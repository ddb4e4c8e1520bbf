//! college-rag: question answering over a college document corpus
//!
//! Documents under the data directory are split into overlapping chunks,
//! embedded through Ollama and stored in a persistent vector index. Each
//! question is embedded, matched against the index, and answered by the
//! language model from the retrieved passages; the answer carries the
//! source documents it was grounded on.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{RagPipeline, RequestOutcome, RequestStage};
pub use types::{
    document::{Chunk, Document, FileType},
    query::ChatRequest,
    response::{ChatAnswer, IndexReport, SourceRef},
};
