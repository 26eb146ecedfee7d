//! Turning uploaded files into `(filename, text)` documents.
//!
//! Extraction is keyed by lowercase file extension. Plain-text formats are
//! built in; richer formats register their own [`TextExtractor`].

use super::chunking_strategy::Document;
use crate::error::{Result, RetrieverError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces plain text from one file.
pub trait TextExtractor: Send + Sync {
    /// Lowercase extensions (without the dot) this extractor handles
    fn extensions(&self) -> &[&'static str];

    fn extract(&self, path: &Path) -> Result<String>;
}

/// Reads the file as UTF-8, replacing invalid sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extensions(&self) -> &[&'static str] {
        &["txt", "md", "markdown", "csv"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Registry of extractors keyed by extension
#[derive(Clone)]
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// A registry with no extractors.
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Register `extractor` for all of its extensions, replacing earlier registrations.
    pub fn register<E: TextExtractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn TextExtractor> = Arc::new(extractor);
        for ext in extractor.extensions() {
            self.by_extension
                .insert(ext.to_string(), Arc::clone(&extractor));
        }
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.get_for_file(path).is_some()
    }

    pub fn get_for_file(&self, path: &Path) -> Option<Arc<dyn TextExtractor>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.by_extension.get(&ext).cloned()
    }

    pub fn extract(&self, path: &Path) -> Result<String> {
        let extractor = self
            .get_for_file(path)
            .ok_or_else(|| RetrieverError::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;
        extractor.extract(path)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PlainTextExtractor);
        registry
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&String> = self.by_extension.keys().collect();
        extensions.sort();
        f.debug_struct("ExtractorRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Every `.txt` file directly inside `dir`, ordered by file name.
pub fn load_documents_from_dir(dir: &Path) -> Result<Vec<Document>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = PlainTextExtractor.extract(&path)?;
        documents.push(Document::new(file_name(&path), text));
    }
    tracing::info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

/// One document per path, keyed by file name. Files that fail to extract are
/// logged and skipped, so one bad upload does not sink the batch.
pub fn load_documents_from_paths(paths: &[PathBuf], registry: &ExtractorRegistry) -> Vec<Document> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        match registry.extract(path) {
            Ok(text) => documents.push(Document::new(file_name(path), text)),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }
    tracing::info!(
        "Extracted {} of {} uploaded files",
        documents.len(),
        paths.len()
    );
    documents
}
