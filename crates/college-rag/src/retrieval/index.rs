//! Persistent vector index with atomic generation swaps
//!
//! The index holds one immutable [`IndexSnapshot`] behind an
//! `RwLock<Option<Arc<_>>>`. Readers clone the `Arc` under a short read lock
//! and search without holding any lock. A rebuild prepares and persists the
//! next snapshot first, then publishes it with a single pointer swap, so a
//! query sees either the old generation or the new one and never a mix.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Bumped when the on-disk layout changes
const FORMAT_VERSION: u32 = 1;

/// A chunk and its embedding, stored together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The chunk
    pub chunk: Chunk,
    /// Its embedding
    pub embedding: Vec<f32>,
}

/// One query hit
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Matched chunk
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Result of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    /// Generation number now being served
    pub generation: u64,
    /// Number of entries
    pub entries: usize,
    /// Distinct chunk sources
    pub unique_sources: usize,
    /// Build timestamp
    pub built_at: DateTime<Utc>,
}

/// Index statistics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexStats {
    /// Whether a build or load has succeeded
    pub initialized: bool,
    /// Number of stored chunks
    pub total_chunks: usize,
    /// Current generation
    pub generation: Option<u64>,
    /// When the current generation was built
    pub built_at: Option<DateTime<Utc>>,
    /// Embedding dimension
    pub dimensions: usize,
    /// Embedding model the vectors came from
    pub embedding_model: String,
}

/// Immutable contents of one index generation
#[derive(Debug)]
struct IndexSnapshot {
    generation: u64,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
    /// L2 norm of each entry's embedding
    norms: Vec<f32>,
}

impl IndexSnapshot {
    fn new(generation: u64, built_at: DateTime<Utc>, entries: Vec<IndexEntry>) -> Self {
        let norms = entries.iter().map(|e| l2_norm(&e.embedding)).collect();
        Self {
            generation,
            built_at,
            entries,
            norms,
        }
    }
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    format_version: u32,
    embedding_model: &'a str,
    dimensions: usize,
    generation: u64,
    built_at: DateTime<Utc>,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct PersistedIndex {
    format_version: u32,
    embedding_model: String,
    dimensions: usize,
    generation: u64,
    built_at: DateTime<Utc>,
    entries: Vec<IndexEntry>,
}

/// Vector index over chunk embeddings, persisted as a single JSON file
pub struct VectorIndex {
    path: PathBuf,
    dimensions: usize,
    embedding_model: String,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
}

impl VectorIndex {
    /// Open the index stored at `path`
    ///
    /// A missing file leaves the index uninitialized. An unreadable or corrupt
    /// file is logged and likewise leaves it uninitialized. A file built with a
    /// different dimension or embedding model is a configuration error.
    pub fn open(
        path: impl Into<PathBuf>,
        dimensions: usize,
        embedding_model: impl Into<String>,
    ) -> Result<Self> {
        let index = Self {
            path: path.into(),
            dimensions,
            embedding_model: embedding_model.into(),
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
        };

        if index.path.exists() {
            if let Some(snapshot) = index.load()? {
                tracing::info!(
                    "Loaded vector index generation {} with {} chunks from {}",
                    snapshot.generation,
                    snapshot.entries.len(),
                    index.path.display()
                );
                *index.current.write() = Some(Arc::new(snapshot));
            }
        } else {
            tracing::info!(
                "No vector index at {}; run the indexing pass first",
                index.path.display()
            );
        }

        Ok(index)
    }

    fn load(&self) -> Result<Option<IndexSnapshot>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cannot read vector index {}: {}", self.path.display(), e);
                return Ok(None);
            }
        };

        let persisted: PersistedIndex = match serde_json::from_str(&content) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Ignoring corrupt vector index {}: {}", self.path.display(), e);
                return Ok(None);
            }
        };

        if persisted.format_version != FORMAT_VERSION {
            tracing::warn!(
                "Ignoring vector index {} with unsupported format version {}",
                self.path.display(),
                persisted.format_version
            );
            return Ok(None);
        }
        if persisted.dimensions != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: persisted.dimensions,
            });
        }
        if persisted.embedding_model != self.embedding_model {
            return Err(Error::config(format!(
                "Vector index {} was built with embedding model '{}' but '{}' is configured; re-run indexing",
                self.path.display(),
                persisted.embedding_model,
                self.embedding_model
            )));
        }
        if let Some(bad) = persisted
            .entries
            .iter()
            .find(|e| e.embedding.len() != self.dimensions)
        {
            tracing::warn!(
                "Ignoring vector index {}: entry from {} has {} dimensions",
                self.path.display(),
                bad.chunk.source,
                bad.embedding.len()
            );
            return Ok(None);
        }

        Ok(Some(IndexSnapshot::new(
            persisted.generation,
            persisted.built_at,
            persisted.entries,
        )))
    }

    /// Replace the whole collection with `entries`
    ///
    /// The new generation is written to disk before it is published. On any
    /// error the previous generation stays in memory and on disk.
    pub fn build(&self, entries: Vec<IndexEntry>) -> Result<BuildSummary> {
        let _guard = self.build_lock.lock();

        for entry in &entries {
            self.check_dimensions(entry.embedding.len())?;
        }

        let generation = self.generation().unwrap_or(0) + 1;
        let snapshot = IndexSnapshot::new(generation, Utc::now(), entries);

        self.persist(&snapshot)?;

        let summary = BuildSummary {
            generation,
            entries: snapshot.entries.len(),
            unique_sources: unique_sources(&snapshot.entries),
            built_at: snapshot.built_at,
        };

        *self.current.write() = Some(Arc::new(snapshot));

        tracing::info!(
            "Published vector index generation {} ({} chunks, {} sources)",
            summary.generation,
            summary.entries,
            summary.unique_sources
        );

        Ok(summary)
    }

    fn persist(&self, snapshot: &IndexSnapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let persisted = PersistedIndexRef {
            format_version: FORMAT_VERSION,
            embedding_model: &self.embedding_model,
            dimensions: self.dimensions,
            generation: snapshot.generation,
            built_at: snapshot.built_at,
            entries: &snapshot.entries,
        };

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, &persisted)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }

    /// Nearest neighbours of `vector` by cosine similarity
    ///
    /// Returns at most `k` hits, most similar first. Equal similarities keep
    /// insertion order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let snapshot = self.snapshot().ok_or(Error::NotInitialized)?;
        self.check_dimensions(vector.len())?;

        let query_norm = l2_norm(vector);
        let mut scored: Vec<(usize, f32)> = snapshot
            .entries
            .iter()
            .zip(&snapshot.norms)
            .enumerate()
            .map(|(i, (entry, norm))| (i, cosine(vector, query_norm, &entry.embedding, *norm)))
            .collect();

        // Stable sort, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, similarity)| Neighbor {
                chunk: snapshot.entries[i].chunk.clone(),
                similarity,
            })
            .collect())
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        if actual != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual,
            });
        }
        Ok(())
    }

    fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    /// Number of stored chunks (0 when uninitialized)
    pub fn size(&self) -> usize {
        self.snapshot().map(|s| s.entries.len()).unwrap_or(0)
    }

    /// Whether a build or load has succeeded
    pub fn is_initialized(&self) -> bool {
        self.current.read().is_some()
    }

    /// Current generation
    pub fn generation(&self) -> Option<u64> {
        self.snapshot().map(|s| s.generation)
    }

    /// Configured embedding dimension
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Location of the persisted index
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        let snapshot = self.snapshot();
        IndexStats {
            initialized: snapshot.is_some(),
            total_chunks: snapshot.as_ref().map(|s| s.entries.len()).unwrap_or(0),
            generation: snapshot.as_ref().map(|s| s.generation),
            built_at: snapshot.as_ref().map(|s| s.built_at),
            dimensions: self.dimensions,
            embedding_model: self.embedding_model.clone(),
        }
    }
}

fn unique_sources(entries: &[IndexEntry]) -> usize {
    entries
        .iter()
        .map(|e| e.chunk.source.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with precomputed norms; 0.0 if either vector is zero
fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
