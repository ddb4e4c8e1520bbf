//! Configuration for the RAG system
//!
//! A single [`RagConfig`] is built once at startup from defaults, an optional
//! TOML file and environment overrides, then validated. Components receive it
//! by reference; nothing re-reads configuration while serving.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Longest question accepted by the pipeline, in characters
pub const MAX_QUESTION_CHARS: usize = 500;

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Document source configuration
    pub documents: DocumentsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model name
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text, 384 for all-minilm)
    pub dimensions: usize,
    /// Timeout for a single embedding call in seconds
    pub timeout_secs: u64,
    /// Concurrent embedding calls during indexing
    pub parallelism: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 30,
            parallelism: 4,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate (Ollama `num_predict`)
    pub max_tokens: u32,
    /// Timeout for a single generation call in seconds
    pub timeout_secs: u64,
    /// Retries after a failed external call (0 or 1)
    pub max_retries: u32,
    /// Timeout for the availability probe in seconds
    pub health_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:1b".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            timeout_secs: 120,
            max_retries: 1,
            health_timeout_secs: 5,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per question
    pub top_k: usize,
    /// Drop results below this relevance (0.0 keeps everything)
    pub min_relevance: f32,
    /// Maximum characters of chunk content echoed back per source
    pub excerpt_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_relevance: 0.0,
            excerpt_chars: 300,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory holding the persisted index
    pub storage_dir: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("vector_db"),
        }
    }
}

impl VectorDbConfig {
    /// Path of the persisted index file
    pub fn index_path(&self) -> PathBuf {
        self.storage_dir.join("index.json")
    }
}

/// Document source configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Root of the document tree read by the indexing pass
    pub data_dir: PathBuf,
    /// Optional system prompt file; the built-in policy is used when absent
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            system_prompt_path: Some(PathBuf::from("prompts/system_prompt.txt")),
        }
    }
}

impl RagConfig {
    /// Load configuration: defaults, then the TOML file (if given), then
    /// environment overrides (a `.env` file is honoured), then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file (unset fields keep their defaults)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from `OLLAMA_*`, `TOP_K_RESULTS`, `DATA_DIR` and `VECTOR_DB_DIR`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(model) = lookup("OLLAMA_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(value) = lookup("OLLAMA_TEMPERATURE") {
            self.llm.temperature = parse_env("OLLAMA_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("OLLAMA_MAX_TOKENS") {
            self.llm.max_tokens = parse_env("OLLAMA_MAX_TOKENS", &value)?;
        }
        if let Some(value) = lookup("TOP_K_RESULTS") {
            self.retrieval.top_k = parse_env("TOP_K_RESULTS", &value)?;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.documents.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VECTOR_DB_DIR") {
            self.vector_db.storage_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Reject invalid combinations before any work starts
    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("top_k must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_relevance) {
            return Err(Error::config("min_relevance must be within [0, 1]"));
        }
        if self.retrieval.excerpt_chars == 0 {
            return Err(Error::config("excerpt_chars must be greater than zero"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embedding dimensions must be greater than zero"));
        }
        if self.embeddings.parallelism == 0 {
            return Err(Error::config("embedding parallelism must be greater than zero"));
        }
        if self.embeddings.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(Error::config("embedding and generation timeouts must be non-zero"));
        }
        if self.llm.max_retries > 1 {
            return Err(Error::config(format!(
                "max_retries ({}) may be 0 or 1",
                self.llm.max_retries
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be within [0, 2]",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than zero"));
        }
        Ok(())
    }

    /// Timeout applied to each embedding call
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embeddings.timeout_secs)
    }

    /// Timeout applied to each generation call
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("{} has invalid value '{}': {}", key, value, e)))
}
