//! Query-time retrieval: embed, search, threshold, resolve provenance.

use super::embedding::EmbeddingOrchestrator;
use super::live_index::LiveIndex;
use crate::ann::AnnIndex;
use crate::error::{Result, RetrieverError};
use crate::storage::Generation;
use docqa_context::Passage;
use docqa_embed::EmbedError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A threshold that every finite score passes.
pub const PERMISSIVE_THRESHOLD: f32 = f32::NEG_INFINITY;

/// One retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub source: String,
    pub text: String,
    pub score: f32,
}

impl ScoredChunk {
    pub fn as_passage(&self) -> Passage<'_> {
        Passage {
            source: &self.source,
            text: &self.text,
            score: self.score,
        }
    }
}

/// Search one loaded generation.
///
/// Asks the index for the `top_k` nearest vectors and drops those scoring
/// below `threshold`. The index's rank order is kept as is.
pub fn search_generation(
    generation: &Generation,
    query: &[f32],
    top_k: usize,
    threshold: f32,
) -> Result<Vec<ScoredChunk>> {
    let dimension = generation.index.dimension();
    if query.len() != dimension {
        return Err(EmbedError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        }
        .into());
    }
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let candidates = generation.index.search(query, top_k);
    let candidate_count = candidates.len();

    let mut results = Vec::with_capacity(candidate_count);
    for (position, score) in candidates {
        if score < threshold {
            continue;
        }
        let record = generation.metadata.get(position).ok_or_else(|| {
            RetrieverError::corrupt(format!(
                "index returned position {position} but metadata has {} records",
                generation.metadata.len()
            ))
        })?;
        results.push(ScoredChunk {
            chunk_id: record.chunk_id.clone(),
            source: record.source.clone(),
            text: record.text.clone(),
            score,
        });
    }

    tracing::debug!(
        "Retrieved {} of {} candidates above threshold {}",
        results.len(),
        candidate_count,
        threshold
    );
    Ok(results)
}

/// Serves queries against the live generation.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: EmbeddingOrchestrator,
    live: Arc<LiveIndex>,
}

impl Retriever {
    pub fn new(embedder: EmbeddingOrchestrator, live: Arc<LiveIndex>) -> Self {
        Self { embedder, live }
    }

    /// Retrieve up to `top_k` chunks scoring at least `threshold`.
    ///
    /// The generation is resolved before the query is embedded, so a missing
    /// index fails with `IndexUnavailable` without calling the embedder.
    pub async fn retrieve(&self, query: &str, top_k: usize, threshold: f32) -> Result<Vec<ScoredChunk>> {
        let generation = self.live.get().await?;
        let embedding = self.embedder.embed_query(query).await?;
        search_generation(&generation, &embedding, top_k, threshold)
    }
}
