//! docqa-retriever: document indexing and retrieval for question answering
//!
//! Documents are chunked into overlapping, word-aligned passages, embedded in
//! one batch, and indexed by an approximate nearest-neighbor structure. Queries
//! are embedded the same way and answered with the most similar passages.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: ingestion pipeline, live index handle, query path, document loading
//! - **[`ann`]**: HNSW, IVF-flat and flat indexes and their binary format
//! - **[`storage`]**: generation persistence and the chunk metadata store
//! - **[`status`]**: on-disk index inspection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docqa_retriever::{DocumentIndex, RetrieverConfig};
//! use docqa_retriever::retrieval::chunking_strategy::Document;
//!
//! # async fn example() -> docqa_retriever::Result<()> {
//! let index = DocumentIndex::new(RetrieverConfig::new("data/index")).await?;
//! index
//!     .ingest(vec![Document::new("nature.txt", "The sky is blue. The grass is green.")])
//!     .await?;
//!
//! for hit in index.retrieve("What color is the sky?", 5, 0.25).await? {
//!     println!("{:.3} {}", hit.score, hit.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Documents → Chunking → Embeddings → ANN build → index.bin + metadata.json
//!                                                        ↓
//!                   Query → Embedding → LiveIndex (lazy load) → ScoredChunks
//! ```

pub mod ann;
pub mod config;
pub mod error;
pub mod retrieval;
pub mod status;
pub mod storage;

pub use config::{IndexConfig, RetrievalConfig, RetrieverConfig};
pub use error::{Result, RetrieverError};
pub use retrieval::chunking_strategy::Document;
pub use retrieval::indexing_engine::{DocumentIndex, IngestReport};
pub use retrieval::retriever::{PERMISSIVE_THRESHOLD, ScoredChunk};
