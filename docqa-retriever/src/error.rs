//! Error types for indexing and retrieval

use crate::ann::AnnError;
use docqa_embed::EmbedError;
use std::path::PathBuf;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Every failure the indexing and retrieval core reports to its callers.
///
/// The first five variants are the domain failures callers are expected to
/// handle programmatically; the rest wrap infrastructure errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Chunking the input produced nothing to index
    #[error("No valid text chunks found for ingestion")]
    EmptyCorpus,

    /// The embedder was unreachable or returned vectors of the wrong shape
    #[error("Embedding failed: {source}")]
    EmbeddingFailure {
        #[from]
        source: EmbedError,
    },

    /// No index artifact exists yet
    #[error("Index not found at {}; ingest documents first", path.display())]
    IndexUnavailable { path: PathBuf },

    /// The index artifact exists but its metadata does not
    #[error("Metadata not found at {}; ingest documents first", path.display())]
    MetadataMissing { path: PathBuf },

    /// The artifacts on disk do not form a consistent generation
    #[error("Index is corrupt: {reason}")]
    IndexCorrupt { reason: String },

    /// Index construction rejected its input
    #[error("Index build failed: {source}")]
    Index {
        #[from]
        source: AnnError,
    },

    /// Configuration values that cannot be used
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// No extractor is registered for a document's file type
    #[error("Unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Config parse error: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl RetrieverError {
    pub fn corrupt<S: Into<String>>(reason: S) -> Self {
        Self::IndexCorrupt {
            reason: reason.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// True for the failures that mean "ingest first" rather than a fault.
    pub fn is_missing_index(&self) -> bool {
        matches!(
            self,
            Self::IndexUnavailable { .. } | Self::MetadataMissing { .. }
        )
    }
}
