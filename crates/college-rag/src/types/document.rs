//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File types recognised by the document loader
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Word document; recognised but not extractable
    Docx,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "docx" => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// Whether text can be extracted from this type
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Pdf | Self::Txt | Self::Markdown)
    }

    /// Get reason why file type is not supported
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        match self {
            Self::Docx => Some("DOCX extraction is not supported; convert to PDF or text"),
            Self::Unknown => Some("Unknown file type"),
            _ => None,
        }
    }
}

/// A loaded source document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source path as shown to users, e.g. `data/admissions/fees.txt`
    pub path: String,
    /// First directory under the data root, or `general`
    pub category: String,
    /// File type
    pub file_type: FileType,
    /// Extracted text
    pub content: String,
    /// SHA-256 hash of the content (hex)
    pub content_hash: String,
}

impl Document {
    /// Create a document, hashing its content
    pub fn new(
        path: impl Into<String>,
        category: impl Into<String>,
        file_type: FileType,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let content_hash = hex::encode(Sha256::digest(content.as_bytes()));
        Self {
            path: path.into(),
            category: category.into(),
            file_type,
            content,
            content_hash,
        }
    }

    /// Length of the content in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A contiguous window of a document's text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Chunk text
    pub content: String,
    /// Path of the document this chunk came from
    pub source: String,
    /// Position of this chunk within its document (0-based)
    pub chunk_index: usize,
    /// Start offset in characters
    pub char_start: usize,
    /// End offset in characters (exclusive)
    pub char_end: usize,
}

impl Chunk {
    /// Content truncated to `max_chars` characters, with `...` appended when cut
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.content[..byte_idx]),
            None => self.content.clone(),
        }
    }
}
