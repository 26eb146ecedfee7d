//! Deterministic feature-hashing embedder.
//!
//! Each lowercase alphanumeric token is hashed with FNV-1a into one of
//! `dimension` buckets; the bucket counts are then L2-normalized. Texts that
//! share words get a positive inner product, texts that share none score zero.
//! There is no model to download, so this provider is used for tests and for
//! air-gapped deployments where lexical overlap is good enough.

use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingResult, normalize_in_place};
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

#[derive(Debug, Clone)]
pub struct HashingEmbedProvider {
    dimension: usize,
    batch_size: usize,
}

impl HashingEmbedProvider {
    pub fn new(dimension: usize, batch_size: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            batch_size: batch_size.max(1),
        }
    }

    /// Embed one text synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            let mut hasher = FnvHasher::default();
            hasher.write(token.as_bytes());
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        normalize_in_place(&mut vector);
        vector
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            tracing::trace!("Hashing batch of {} texts", batch.len());
            embeddings.extend(batch.iter().map(|text| self.embed_sync(text)));
        }
        Ok(EmbeddingResult {
            embeddings,
            dimension: self.dimension,
        })
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        "feature-hashing"
    }
}
