//! Document discovery and text extraction

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{Document, FileType, SkippedDocument};

/// Upper bound on text extraction for a single PDF
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Documents read from the data directory, plus the files that failed
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Loaded documents, in sorted path order
    pub documents: Vec<Document>,
    /// Files that were recognised but could not be loaded
    pub skipped: Vec<SkippedDocument>,
}

/// Loads `.txt`, `.md` and `.pdf` files from a directory tree
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
}

impl DocumentLoader {
    /// Create a loader rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory of the document tree
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every supported file under the data directory
    ///
    /// Per-file failures and files whose content duplicates an earlier one are
    /// recorded in [`LoadOutcome::skipped`]; only a missing data directory
    /// fails the whole call.
    pub fn load_all(&self) -> Result<LoadOutcome> {
        if !self.data_dir.is_dir() {
            return Err(Error::config(format!(
                "Data directory not found: {}",
                self.data_dir.display()
            )));
        }

        let mut outcome = LoadOutcome::default();
        // content hash -> first path seen with it
        let mut seen: HashMap<String, String> = HashMap::new();

        for entry in WalkDir::new(&self.data_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let file_type = path
                .extension()
                .map(|ext| FileType::from_extension(&ext.to_string_lossy()))
                .unwrap_or(FileType::Unknown);

            if file_type == FileType::Unknown {
                continue;
            }

            match self.load_file(path) {
                Ok(doc) => {
                    if let Some(first) = seen.get(&doc.content_hash) {
                        tracing::info!("Skipping {}: same content as {}", doc.path, first);
                        outcome.skipped.push(SkippedDocument {
                            reason: format!("duplicate of {}", first),
                            path: doc.path,
                        });
                        continue;
                    }
                    tracing::debug!("Loaded {} ({} chars)", doc.path, doc.char_len());
                    seen.insert(doc.content_hash.clone(), doc.path.clone());
                    outcome.documents.push(doc);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    outcome.skipped.push(SkippedDocument {
                        path: self.source_path(path),
                        reason: match e {
                            Error::DocumentLoad { message, .. } => message,
                            other => other.to_string(),
                        },
                    });
                }
            }
        }

        tracing::info!(
            "Loaded {} documents from {} ({} skipped)",
            outcome.documents.len(),
            self.data_dir.display(),
            outcome.skipped.len()
        );

        Ok(outcome)
    }

    /// Load a single file
    pub fn load_file(&self, path: &Path) -> Result<Document> {
        let file_type = path
            .extension()
            .map(|ext| FileType::from_extension(&ext.to_string_lossy()))
            .unwrap_or(FileType::Unknown);

        if let Some(reason) = file_type.unsupported_reason() {
            return Err(Error::document_load(path, reason));
        }

        let content = match file_type {
            FileType::Pdf => {
                let data = std::fs::read(path).map_err(|e| Error::document_load(path, e.to_string()))?;
                extract_pdf(path, data)?
            }
            _ => std::fs::read_to_string(path).map_err(|e| Error::document_load(path, e.to_string()))?,
        };

        if content.trim().is_empty() {
            return Err(Error::document_load(path, "no extractable text"));
        }

        Ok(Document::new(
            self.source_path(path),
            self.category(path),
            file_type,
            content,
        ))
    }

    /// Path relative to the data directory's parent, with `/` separators
    /// (e.g. `data/admissions/fees.txt`)
    fn source_path(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.data_dir).unwrap_or(path);
        let root = self
            .data_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        root.into_iter()
            .chain(normal_components(relative))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// First directory below the data root, `general` for top-level files
    fn category(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.data_dir).unwrap_or(path);
        let parts: Vec<String> = normal_components(relative).collect();
        if parts.len() > 1 {
            parts[0].clone()
        } else {
            "general".to_string()
        }
    }
}

/// Run pdf-extract on its own thread; it panics or hangs on some malformed fonts
fn extract_pdf(path: &Path, data: Vec<u8>) -> Result<String> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let _ = tx.send(pdf_extract::extract_text_from_mem(&data));
    });

    match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
        Ok(Ok(text)) => {
            let _ = handle.join();
            Ok(text)
        }
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(Error::document_load(path, format!("PDF extraction failed: {}", e)))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::document_load(
            path,
            format!("PDF extraction timed out after {:?}", PDF_EXTRACT_TIMEOUT),
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = handle.join();
            Err(Error::document_load(path, "PDF extraction crashed on malformed content"))
        }
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}
