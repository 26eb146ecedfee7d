//! Configuration for the indexing and retrieval core.
//!
//! Every section has defaults matching the reference deployment, so a TOML
//! file only needs the keys it wants to change:
//!
//! ```toml
//! [chunking]
//! chunk_size = 300
//!
//! [index]
//! dir = "/var/lib/docqa/index"
//! kind = "ivf_flat"
//! nlist = 64
//!
//! [retrieval]
//! similarity_threshold = 0.25
//! ```

use crate::ann::IndexKind;
use crate::error::{Result, RetrieverError};
use crate::retrieval::chunking_strategy::ChunkingConfig;
use docqa_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Threshold used when none is configured. Far below any inner product of unit
/// vectors, so every candidate passes.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = -100.0;

/// ANN index construction and search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the index and metadata artifacts
    pub dir: PathBuf,
    /// Which index structure to build
    pub kind: IndexKind,
    /// HNSW: neighbor bound per node per layer
    pub m: usize,
    /// HNSW: beam width while inserting
    pub ef_construction: usize,
    /// HNSW: beam width while searching, applied at load time
    pub ef_search: usize,
    /// IVF: number of k-means partitions
    pub nlist: usize,
    /// IVF: partitions scanned per query, applied at load time
    pub nprobe: usize,
}

impl IndexConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_hnsw(mut self, m: usize, ef_construction: usize, ef_search: usize) -> Self {
        self.m = m;
        self.ef_construction = ef_construction;
        self.ef_search = ef_search;
        self
    }

    pub fn with_ivf(mut self, nlist: usize, nprobe: usize) -> Self {
        self.nlist = nlist;
        self.nprobe = nprobe;
        self
    }

    /// The search-time breadth for the configured kind (efSearch or nprobe).
    pub fn search_breadth(&self) -> usize {
        match self.kind {
            IndexKind::Hnsw => self.ef_search,
            IndexKind::IvfFlat => self.nprobe,
            IndexKind::Flat => 0,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/index"),
            kind: IndexKind::Hnsw,
            m: 32,
            ef_construction: 200,
            ef_search: 64,
            nlist: 16,
            nprobe: 4,
        }
    }
}

/// Query-time defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest candidates requested from the index
    pub top_k: usize,
    /// Candidates scoring below this are dropped
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    pub chunking: ChunkingConfig,
    pub embedding: EmbedConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
}

impl RetrieverConfig {
    /// Create a configuration storing its index under `index_dir`.
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index: IndexConfig::new(index_dir),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunking = ChunkingConfig::new(chunk_size, chunk_overlap);
        self
    }

    pub fn with_embedding(mut self, embedding: EmbedConfig) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn with_retrieval(mut self, top_k: usize, similarity_threshold: f32) -> Self {
        self.retrieval = RetrievalConfig {
            top_k,
            similarity_threshold,
        };
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RetrieverError::invalid_config(
                "chunking.chunk_size must be at least 1",
            ));
        }
        if self.index.m < 2 {
            return Err(RetrieverError::invalid_config("index.m must be at least 2"));
        }
        if self.index.ef_construction == 0 || self.index.ef_search == 0 {
            return Err(RetrieverError::invalid_config(
                "index.ef_construction and index.ef_search must be at least 1",
            ));
        }
        if self.index.nlist == 0 || self.index.nprobe == 0 {
            return Err(RetrieverError::invalid_config(
                "index.nlist and index.nprobe must be at least 1",
            ));
        }
        if self.index.nprobe > self.index.nlist {
            return Err(RetrieverError::invalid_config(format!(
                "index.nprobe ({}) cannot exceed index.nlist ({})",
                self.index.nprobe, self.index.nlist
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(RetrieverError::invalid_config(
                "retrieval.top_k must be at least 1",
            ));
        }
        if self.retrieval.similarity_threshold.is_nan() {
            return Err(RetrieverError::invalid_config(
                "retrieval.similarity_threshold must be a number",
            ));
        }
        self.embedding.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_embed::ProviderKind;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = RetrieverConfig::default();

        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.index.dir, PathBuf::from("data/index"));
        assert_eq!(config.index.kind, IndexKind::Hnsw);
        assert_eq!(config.index.m, 32);
        assert_eq!(config.index.ef_construction, 200);
        assert_eq!(config.index.ef_search, 64);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.similarity_threshold, -100.0);
        assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() -> Result<()> {
        let config = RetrieverConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 300

            [embedding]
            provider = "hashing"
            dimension = 128

            [index]
            dir = "/tmp/docqa"
            kind = "ivf_flat"
            nlist = 8
            nprobe = 2

            [retrieval]
            similarity_threshold = 0.25
            "#,
        )?;

        assert_eq!(config.chunking.chunk_size, 300);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.embedding.provider, ProviderKind::Hashing);
        assert_eq!(config.embedding.dimension, 128);
        assert_eq!(config.index.kind, IndexKind::IvfFlat);
        assert_eq!(config.index.search_breadth(), 2);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.similarity_threshold, 0.25);
        Ok(())
    }

    #[test]
    fn test_validation_failures() {
        let zero_chunk = RetrieverConfig::default().with_chunking(0, 0);
        assert!(matches!(
            zero_chunk.validate(),
            Err(RetrieverError::InvalidConfig { .. })
        ));

        let mut probe_too_wide = RetrieverConfig::default();
        probe_too_wide.index = probe_too_wide.index.with_ivf(4, 8);
        assert!(probe_too_wide.validate().is_err());

        let zero_k = RetrieverConfig::default().with_retrieval(0, 0.0);
        assert!(zero_k.validate().is_err());

        let mut tiny_m = RetrieverConfig::default();
        tiny_m.index = tiny_m.index.with_hnsw(1, 200, 64);
        assert!(tiny_m.validate().is_err());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result = RetrieverConfig::from_toml_str("[index]\nkind = \"lsh\"\n");
        assert!(matches!(result, Err(RetrieverError::ConfigParse { .. })));
    }
}
