//! Status reporting for an index directory.
//!
//! Reads the artifacts straight from disk; the live handle is neither used
//! nor populated.

use crate::ann::{AnnIndex, IndexKind};
use crate::error::Result;
use crate::storage::GenerationStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What is on disk for one index directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub dir: PathBuf,
    /// Whether a generation has been persisted
    pub exists: bool,
    /// Whether the owning service currently holds the generation in memory
    pub loaded: bool,
    pub kind: Option<IndexKind>,
    pub vectors: usize,
    pub dimension: usize,
    /// Number of distinct source documents
    pub sources: usize,
    pub index_bytes: u64,
    pub metadata_bytes: u64,
    /// Hex blake3 checksum of the index payload
    pub checksum: Option<String>,
    /// Modification time of the index artifact
    pub built_at: Option<DateTime<Utc>>,
}

impl IndexStatus {
    fn absent(dir: PathBuf) -> Self {
        Self {
            dir,
            exists: false,
            loaded: false,
            kind: None,
            vectors: 0,
            dimension: 0,
            sources: 0,
            index_bytes: 0,
            metadata_bytes: 0,
            checksum: None,
            built_at: None,
        }
    }

    /// Multi-line human readable summary.
    pub fn summary(&self) -> String {
        if !self.exists {
            return format!(
                "No index at {}. Run `docqa-retriever ingest` first.",
                self.dir.display()
            );
        }
        let mut lines = vec![
            format!("Index directory: {}", self.dir.display()),
            format!(
                "Kind: {}",
                self.kind.map(|k| k.to_string()).unwrap_or_default()
            ),
            format!("Vectors: {} (dimension {})", self.vectors, self.dimension),
            format!("Sources: {}", self.sources),
            format!(
                "Artifacts: index {} bytes, metadata {} bytes",
                self.index_bytes, self.metadata_bytes
            ),
        ];
        if let Some(checksum) = &self.checksum {
            lines.push(format!("Checksum: {checksum}"));
        }
        if let Some(built_at) = &self.built_at {
            lines.push(format!("Built: {}", built_at.to_rfc3339()));
        }
        lines.push(format!("Loaded: {}", if self.loaded { "yes" } else { "no" }));
        lines.join("\n")
    }
}

/// Inspect the generation in `store` without touching any live handle.
pub fn collect(store: &GenerationStore) -> Result<IndexStatus> {
    if !store.exists() {
        return Ok(IndexStatus::absent(store.dir().to_path_buf()));
    }

    let generation = store.load(0)?;
    let index_meta = std::fs::metadata(store.index_path())?;
    let metadata_bytes = std::fs::metadata(store.metadata_path())?.len();
    let built_at = index_meta.modified().ok().map(DateTime::<Utc>::from);

    Ok(IndexStatus {
        dir: store.dir().to_path_buf(),
        exists: true,
        loaded: false,
        kind: Some(generation.index.kind()),
        vectors: generation.index.len(),
        dimension: generation.index.dimension(),
        sources: generation.metadata.sources().len(),
        index_bytes: index_meta.len(),
        metadata_bytes,
        checksum: Some(generation.checksum_hex()),
        built_at,
    })
}
