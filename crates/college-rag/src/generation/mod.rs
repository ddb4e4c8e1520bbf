//! Answer generation: prompt assembly and orchestration

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::AnswerOrchestrator;
pub use prompt::{PromptBuilder, DEFAULT_SYSTEM_PROMPT, NO_DOCUMENTS_MARKER};
