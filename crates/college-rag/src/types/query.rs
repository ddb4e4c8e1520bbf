//! Chat request types

use serde::{Deserialize, Serialize};

use crate::config::MAX_QUESTION_CHARS;
use crate::error::{Error, Result};

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,

    /// Opaque value echoed back in the answer
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Create a request without a conversation id
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            conversation_id: None,
        }
    }
}

/// Check a question is non-blank and at most [`MAX_QUESTION_CHARS`] long
pub fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::InvalidRequest("question must not be empty".to_string()));
    }
    let len = question.chars().count();
    if len > MAX_QUESTION_CHARS {
        return Err(Error::InvalidRequest(format!(
            "question is {} characters; the limit is {}",
            len, MAX_QUESTION_CHARS
        )));
    }
    Ok(())
}
