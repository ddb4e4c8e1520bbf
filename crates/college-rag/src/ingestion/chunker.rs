//! Fixed-window text chunking with character offset tracking

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Text chunker with configurable size and overlap
///
/// Windows are `chunk_size` characters long and advance by
/// `chunk_size - chunk_overlap`. The final window is cut at the end of the
/// document, so every pair of neighbours shares exactly `chunk_overlap`
/// characters and a document of length `L >= chunk_size` yields
/// `ceil((L - overlap) / (size - overlap))` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Window length in characters
    chunk_size: usize,
    /// Characters shared by neighbouring windows
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker, rejecting `chunk_size == 0` and `overlap >= chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Create a chunker from the chunking section of the configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Window length in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split a document into overlapping chunks
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        self.chunk_text(&doc.content, &doc.path)
    }

    /// Split raw text into overlapping chunks attributed to `source`
    pub fn chunk_text(&self, text: &str, source: &str) -> Vec<Chunk> {
        // Byte offset of every char, plus the end of the string, so char
        // positions can be sliced without landing inside a code point.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = boundaries.len() - 1;

        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(len);
            chunks.push(Chunk {
                content: text[boundaries[start]..boundaries[end]].to_string(),
                source: source.to_string(),
                chunk_index: chunks.len(),
                char_start: start,
                char_end: end,
            });
            if end == len {
                break;
            }
            start += self.stride();
        }

        chunks
    }
}
