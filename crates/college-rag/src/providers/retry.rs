//! Timeout and bounded retry for calls to external model services

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::RagConfig;
use crate::error::{Error, Result};

/// Pause between the first attempt and the retry
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Which external service a call belongs to; decides the error it fails with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    /// Embedding of a question or chunk
    Embedding,
    /// Answer generation
    Generation,
}

impl CallStage {
    fn unavailable(self, message: String) -> Error {
        match self {
            CallStage::Embedding => Error::EmbeddingUnavailable(message),
            CallStage::Generation => Error::GenerationUnavailable(message),
        }
    }
}

/// One timeout per attempt and at most one retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl CallPolicy {
    /// Create a policy; `max_retries` above 1 is clamped to 1
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries: max_retries.min(1),
            backoff: RETRY_BACKOFF,
        }
    }

    /// Policy for embedding calls
    pub fn embedding(config: &RagConfig) -> Self {
        Self::new(config.embedding_timeout(), config.llm.max_retries)
    }

    /// Policy for generation calls
    pub fn generation(config: &RagConfig) -> Self {
        Self::new(config.generation_timeout(), config.llm.max_retries)
    }

    /// Override the pause between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `operation` under the policy
    ///
    /// Configuration errors are returned immediately. Anything else, including
    /// a timeout, is retried once and then reported as the stage's
    /// unavailable error.
    pub async fn run<F, Fut, T>(&self, stage: CallStage, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match timeout(self.timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_configuration() => return Err(e),
                Ok(Err(e)) => {
                    last_error = match e {
                        Error::EmbeddingUnavailable(msg) | Error::GenerationUnavailable(msg) => msg,
                        other => other.to_string(),
                    };
                }
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.timeout);
                }
            }

            if attempt < attempts {
                tracing::warn!(
                    "{:?} call failed (attempt {}/{}): {}, retrying in {:?}",
                    stage,
                    attempt,
                    attempts,
                    last_error,
                    self.backoff
                );
                sleep(self.backoff).await;
            }
        }

        Err(stage.unavailable(last_error))
    }
}
