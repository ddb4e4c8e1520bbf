//! Core types for documents, chunks, requests and responses

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType};
pub use query::ChatRequest;
pub use response::{ChatAnswer, IndexReport, SkippedDocument, SourceRef};
