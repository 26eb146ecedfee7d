//! Approximate nearest-neighbor indexes over unit-norm vectors.
//!
//! Every index scores by inner product (cosine similarity for unit vectors) and
//! identifies vectors by insertion position: the i-th vector added gets id `i`.
//! Metadata records are stored in the same order, which is what lets a search
//! hit be mapped back to its chunk.

pub mod codec;
pub mod flat;
pub mod hnsw;
pub mod ivf;
mod scored;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use ivf::IvfFlatIndex;

use crate::config::IndexConfig;
use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};

/// Errors raised by the index structures themselves
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Empty vector")]
    EmptyVector,
    #[error("Index must be trained before vectors are added")]
    NotTrained,
    #[error("Cannot train on an empty set of vectors")]
    EmptyTrainingSet,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The index structures that can be built and persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Multi-layer proximity graph
    Hnsw,
    /// Inverted lists over k-means partitions, exact scoring inside each list
    IvfFlat,
    /// Exhaustive scan
    Flat,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Hnsw => "hnsw",
            IndexKind::IvfFlat => "ivf_flat",
            IndexKind::Flat => "flat",
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            IndexKind::Hnsw => 1,
            IndexKind::IvfFlat => 2,
            IndexKind::Flat => 3,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(IndexKind::Hnsw),
            2 => Some(IndexKind::IvfFlat),
            3 => Some(IndexKind::Flat),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndexKind {
    type Err = RetrieverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "hnsw" => Ok(IndexKind::Hnsw),
            "ivf_flat" | "ivf" => Ok(IndexKind::IvfFlat),
            "flat" => Ok(IndexKind::Flat),
            other => Err(RetrieverError::invalid_config(format!(
                "unknown index kind: {other}"
            ))),
        }
    }
}

/// Common surface of the index structures.
///
/// `search` returns at most `k` `(position, score)` pairs ordered by score
/// descending, ties broken by ascending position.
pub trait AnnIndex {
    fn kind(&self) -> IndexKind;

    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_trained(&self) -> bool {
        true
    }

    /// Fit any learned structure (partition centroids) to a sample of vectors.
    fn train(&mut self, _vectors: &[Vec<f32>]) -> std::result::Result<(), AnnError> {
        Ok(())
    }

    /// Append a vector and return its position.
    fn add(&mut self, vector: Vec<f32>) -> std::result::Result<usize, AnnError>;

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Adjust the search-time breadth (efSearch or nprobe). Zero is ignored.
    fn set_search_breadth(&mut self, _breadth: usize) {}
}

/// An index of any supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum VectorIndex {
    Hnsw(HnswIndex),
    IvfFlat(IvfFlatIndex),
    Flat(FlatIndex),
}

impl VectorIndex {
    /// An empty, untrained index for `dimension`-sized vectors.
    pub fn empty(dimension: usize, config: &IndexConfig) -> Self {
        match config.kind {
            IndexKind::Hnsw => VectorIndex::Hnsw(HnswIndex::new(
                dimension,
                config.m,
                config.ef_construction,
                config.ef_search,
            )),
            IndexKind::IvfFlat => {
                VectorIndex::IvfFlat(IvfFlatIndex::new(dimension, config.nlist, config.nprobe))
            }
            IndexKind::Flat => VectorIndex::Flat(FlatIndex::new(dimension)),
        }
    }

    fn inner(&self) -> &dyn AnnIndex {
        match self {
            VectorIndex::Hnsw(index) => index,
            VectorIndex::IvfFlat(index) => index,
            VectorIndex::Flat(index) => index,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn AnnIndex {
        match self {
            VectorIndex::Hnsw(index) => index,
            VectorIndex::IvfFlat(index) => index,
            VectorIndex::Flat(index) => index,
        }
    }
}

impl AnnIndex for VectorIndex {
    fn kind(&self) -> IndexKind {
        self.inner().kind()
    }

    fn dimension(&self) -> usize {
        self.inner().dimension()
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }

    fn train(&mut self, vectors: &[Vec<f32>]) -> std::result::Result<(), AnnError> {
        self.inner_mut().train(vectors)
    }

    fn add(&mut self, vector: Vec<f32>) -> std::result::Result<usize, AnnError> {
        self.inner_mut().add(vector)
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        self.inner().search(query, k)
    }

    fn set_search_breadth(&mut self, breadth: usize) {
        self.inner_mut().set_search_breadth(breadth)
    }
}

/// Inner product of two equal-length vectors.
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn check_vector(dimension: usize, vector: &[f32]) -> std::result::Result<(), AnnError> {
    if vector.is_empty() {
        return Err(AnnError::EmptyVector);
    }
    if vector.len() != dimension {
        return Err(AnnError::DimensionMismatch {
            expected: dimension,
            got: vector.len(),
        });
    }
    Ok(())
}

/// Order `(position, score)` hits by score descending, then position ascending.
pub(crate) fn sort_hits(hits: &mut [(usize, f32)]) {
    hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
}

/// Build an index over `rows`, training first and then adding every row in
/// order so that row `i` is stored at position `i`.
pub fn build_index(rows: &[Vec<f32>], config: &IndexConfig) -> Result<VectorIndex> {
    let dimension = match rows.first() {
        Some(first) => first.len(),
        None => return Err(RetrieverError::EmptyCorpus),
    };

    let mut index = VectorIndex::empty(dimension, config);
    index.train(rows)?;
    for (expected, row) in rows.iter().enumerate() {
        let position = index.add(row.clone())?;
        if position != expected {
            return Err(RetrieverError::corrupt(format!(
                "vector {expected} was stored at position {position}"
            )));
        }
    }

    tracing::info!(
        "Built {} index with {} vectors of dimension {}",
        index.kind(),
        index.len(),
        dimension
    );
    Ok(index)
}

#[cfg(test)]
pub(crate) mod test_vectors {
    use docqa_embed::normalize_in_place;

    /// Deterministic pseudo-random unit vectors.
    pub fn unit_vectors(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut state = seed;
        (0..count)
            .map(|_| {
                let mut v: Vec<f32> = (0..dimension)
                    .map(|_| {
                        state = state
                            .wrapping_mul(6364136223846793005)
                            .wrapping_add(1442695040888963407);
                        ((state >> 40) as f32 / (1u64 << 24) as f32) - 0.5
                    })
                    .collect();
                normalize_in_place(&mut v);
                v
            })
            .collect()
    }
}
