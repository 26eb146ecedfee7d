use crate::storage::metadata::{ChunkRecord, chunk_id};
use docqa_context::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextChunker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for chunking documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target size of each chunk in characters; chunks grow past it to reach a word boundary
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks, snapped back to a word boundary
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }
}

/// One extracted document: a file name and its plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Collapse documents sharing a source name into one entry.
///
/// The last text for a source wins, but the entry keeps the position where
/// that source first appeared. Chunk ids are derived from the source name,
/// so two documents with the same name would otherwise collide.
pub fn dedup_by_source(documents: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(documents.len());
    let mut unique: Vec<Document> = Vec::with_capacity(documents.len());
    for document in documents {
        match positions.get(&document.source) {
            Some(&position) => {
                tracing::warn!(
                    "Duplicate source {}; keeping the later document",
                    document.source
                );
                unique[position] = document;
            }
            None => {
                positions.insert(document.source.clone(), unique.len());
                unique.push(document);
            }
        }
    }
    unique
}

/// Turns documents into the ordered chunk records of one generation.
#[derive(Debug, Clone)]
pub struct ChunkingStrategy {
    chunker: TextChunker,
}

impl ChunkingStrategy {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap),
        }
    }

    /// Chunk every document in order. Ordinals restart at zero per document,
    /// so chunk ids depend only on the document itself.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<ChunkRecord> {
        let mut records = Vec::new();
        for document in documents {
            let chunks = self.chunker.get_chunks(&document.text);
            tracing::debug!(
                "Chunked {} into {} chunks (size: {}, overlap: {})",
                document.source,
                chunks.len(),
                self.chunker.chunk_size(),
                self.chunker.overlap()
            );
            records.extend(chunks.into_iter().map(|chunk| ChunkRecord {
                chunk_id: chunk_id(&document.source, chunk.sequence),
                source: document.source.clone(),
                text: chunk.chunk_text.to_string(),
            }));
        }
        records
    }
}
