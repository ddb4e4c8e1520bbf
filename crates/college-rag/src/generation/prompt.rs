//! Prompt templates for RAG generation

use std::path::Path;

use crate::retrieval::RetrievalResult;

/// Stands in for the context block when retrieval found nothing
pub const NO_DOCUMENTS_MARKER: &str = "NO RELEVANT DOCUMENTS FOUND";

/// Instructions used when no system prompt file is configured or readable
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful college information assistant. Answer questions about the college using ONLY the context documents provided below.

RULES:
1. Use only information that is stated in the context documents
2. If the context does not contain the answer, say "I don't have information about that in the college documents"
3. Never invent fees, dates, eligibility criteria or contact details
4. When several documents are relevant, combine them into one coherent answer
5. Do not mention file names or source tags in the answer; sources are shown to the user separately
6. Be precise, friendly and concise"#;

/// Assembles generation prompts around a fixed system prompt
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptBuilder {
    /// Use `system_prompt` verbatim
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Read the system prompt from `path`, falling back to the built-in one
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!("Loaded system prompt from {}", path.display());
                Self::new(text.trim())
            }
            Ok(_) => {
                tracing::warn!("System prompt {} is empty, using default", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!(
                    "System prompt not loaded from {} ({}), using default",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// The system instructions
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Tag each retrieved chunk with its source, separated by `---`
    pub fn build_context(retrieved: &RetrievalResult) -> String {
        if retrieved.is_empty() {
            return NO_DOCUMENTS_MARKER.to_string();
        }

        retrieved
            .chunks
            .iter()
            .enumerate()
            .map(|(i, scored)| {
                format!(
                    "[Source {}: {}]\n{}\n",
                    i + 1,
                    scored.chunk.source,
                    scored.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// Build the full prompt for `question`
    pub fn build(&self, question: &str, retrieved: &RetrievalResult) -> String {
        format!(
            "{system}\n\nCONTEXT DOCUMENTS:\n{context}\n\nUSER QUESTION: {question}\n\nANSWER:",
            system = self.system_prompt,
            context = Self::build_context(retrieved),
            question = question,
        )
    }
}
