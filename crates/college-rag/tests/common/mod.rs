//! In-process providers and corpus fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use college_rag::error::{Error, Result};
use college_rag::providers::{EmbeddingProvider, GenerationOptions, LlmProvider};
use college_rag::RagConfig;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const DIMENSIONS: usize = 64;

/// Bag-of-words embedding: each lowercase token is hashed into a bucket
pub struct HashEmbedder {
    pub down: AtomicBool,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            down: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::embedding("connection refused"));
        }

        let mut vector = vec![0.0f32; DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.down.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Replies with a fixed answer and records every prompt it receives
pub struct ScriptedLlm {
    reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        match &self.reply {
            Some(reply) => Ok(format!("  {}\n", reply)),
            None => Err(Error::generation("error sending request: connection refused")),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Write a small college corpus under `root/data`
pub fn write_corpus(root: &Path) {
    let data = root.join("data");
    std::fs::create_dir_all(data.join("admissions")).unwrap();
    std::fs::create_dir_all(data.join("campus")).unwrap();
    std::fs::create_dir_all(data.join("placements")).unwrap();

    std::fs::write(
        data.join("admissions/fees.txt"),
        "B.Tech tuition fee is 1,20,000 rupees per year. The B.Tech fee is paid each semester.",
    )
    .unwrap();
    std::fs::write(
        data.join("campus/hostel.md"),
        "# Hostel\nHostel rooms cost 60,000 rupees annually including meals and laundry.",
    )
    .unwrap();
    std::fs::write(
        data.join("placements/report.txt"),
        "Placement cell statistics: 92 percent of graduates received offers, median package 8 LPA.",
    )
    .unwrap();
}

/// Configuration pointing at `root/data` and `root/vector_db`
pub fn test_config(root: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.documents.data_dir = root.join("data");
    config.documents.system_prompt_path = None;
    config.vector_db.storage_dir = root.join("vector_db");
    config.embeddings.dimensions = DIMENSIONS;
    config.embeddings.timeout_secs = 5;
    config.llm.timeout_secs = 5;
    config
}
