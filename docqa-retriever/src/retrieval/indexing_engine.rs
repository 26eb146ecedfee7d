//! The ingestion pipeline and the service facade around it.
//!
//! ```text
//! documents → ChunkingStrategy → EmbeddingOrchestrator → build_index
//!                                                           ↓
//!       Retriever ← LiveIndex ← invalidate ← GenerationStore::persist
//! ```
//!
//! Every ingestion rebuilds the whole index. A generation reaches disk only
//! after chunking, embedding and graph construction have all succeeded; any
//! failure before that leaves the previous generation in place.

use super::chunking_strategy::{ChunkingStrategy, Document, dedup_by_source};
use super::embedding::EmbeddingOrchestrator;
use super::live_index::LiveIndex;
use super::retriever::{Retriever, ScoredChunk};
use crate::ann::{AnnIndex, IndexKind, build_index};
use crate::config::RetrieverConfig;
use crate::error::{Result, RetrieverError};
use crate::status::{self, IndexStatus};
use crate::storage::GenerationStore;
use crate::storage::metadata::MetadataStore;
use docqa_embed::{EmbeddingProvider, create_provider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Summary of one successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub sources: usize,
    pub dimension: usize,
    pub kind: IndexKind,
    pub checksum: String,
    pub elapsed_ms: u64,
}

/// Owns one index directory: ingests into it and answers queries from it.
#[derive(Debug)]
pub struct DocumentIndex {
    config: RetrieverConfig,
    chunking: ChunkingStrategy,
    embedder: EmbeddingOrchestrator,
    live: Arc<LiveIndex>,
    retriever: Retriever,
    ingest_lock: Mutex<()>,
}

impl DocumentIndex {
    /// Validate `config` and construct the embedding provider it names.
    pub async fn new(config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        let provider = create_provider(&config.embedding).await?;
        Self::with_provider(config, provider)
    }

    /// Use an already constructed provider instead of the configured one.
    pub fn with_provider(
        config: RetrieverConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;
        if provider.embedding_dimension() == 0 {
            return Err(RetrieverError::invalid_config(format!(
                "embedding provider {} reports dimension 0",
                provider.provider_name()
            )));
        }

        let embedder = EmbeddingOrchestrator::new(provider);
        let store = GenerationStore::new(&config.index.dir);
        let live = Arc::new(LiveIndex::new(store, config.index.search_breadth()));
        let retriever = Retriever::new(embedder.clone(), Arc::clone(&live));

        info!(
            "Document index at {} using {} index and {} embeddings (dimension {})",
            config.index.dir.display(),
            config.index.kind,
            embedder.provider().provider_name(),
            embedder.dimension()
        );

        Ok(Self {
            chunking: ChunkingStrategy::new(&config.chunking),
            config,
            embedder,
            live,
            retriever,
            ingest_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    pub fn live_index(&self) -> &Arc<LiveIndex> {
        &self.live
    }

    /// Rebuild the index from `documents` and make it the live generation.
    ///
    /// Documents are keyed by source name; a repeated name replaces the
    /// earlier text.
    ///
    /// Fails with `EmptyCorpus` if the documents produce no chunks, and with
    /// `EmbeddingFailure` if the embedder fails; neither touches disk.
    pub async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport> {
        let _guard = self.ingest_lock.lock().await;
        let started = Instant::now();

        let documents = dedup_by_source(documents);
        let records = self.chunking.chunk_documents(&documents);
        if records.is_empty() {
            return Err(RetrieverError::EmptyCorpus);
        }
        info!(
            "Chunked {} documents into {} chunks",
            documents.len(),
            records.len()
        );

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let matrix = self.embedder.embed(&texts).await?;
        debug!("Embedded {} chunks (dimension {})", matrix.len(), matrix.dimension);

        let metadata = MetadataStore::new(records);
        let index_config = self.config.index.clone();
        let store = self.live.store().clone();
        let (checksum, kind, chunks, sources) =
            tokio::task::spawn_blocking(move || -> Result<([u8; 32], IndexKind, usize, usize)> {
                let index = build_index(&matrix.rows, &index_config)?;
                let checksum = store.persist(&index, &metadata)?;
                Ok((checksum, index.kind(), index.len(), metadata.sources().len()))
            })
            .await??;

        self.live.invalidate().await;

        let report = IngestReport {
            documents: documents.len(),
            chunks,
            sources,
            dimension: self.embedder.dimension(),
            kind,
            checksum: hex::encode(checksum),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Ingested {} chunks from {} sources in {} ms",
            report.chunks, report.sources, report.elapsed_ms
        );
        Ok(report)
    }

    /// Retrieve up to `top_k` chunks scoring at least `threshold`, best first.
    pub async fn retrieve(&self, query: &str, top_k: usize, threshold: f32) -> Result<Vec<ScoredChunk>> {
        self.retriever.retrieve(query, top_k, threshold).await
    }

    /// Retrieve with the configured `top_k` and threshold.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retrieve(
            query,
            self.config.retrieval.top_k,
            self.config.retrieval.similarity_threshold,
        )
        .await
    }

    /// Drop the live generation; the next query reloads from disk.
    pub async fn invalidate_index(&self) {
        self.live.invalidate().await;
    }

    pub async fn status(&self) -> Result<IndexStatus> {
        let store = self.live.store().clone();
        let mut report = tokio::task::spawn_blocking(move || status::collect(&store)).await??;
        report.loaded = self.live.is_loaded().await;
        Ok(report)
    }
}
