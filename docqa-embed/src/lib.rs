//! # docqa-embed
//!
//! Text embedding providers for the document question-answering stack. The
//! retrieval core treats embedding as a capability: give it a batch of strings,
//! get back one unit-length `f32` vector per string, all of the same dimension.
//!
//! ## Features
//!
//! - **Local ONNX Models**: Run sentence-transformer models locally through FastEmbed
//! - **Async-First Design**: Blocking inference is moved off the runtime with `spawn_blocking`
//! - **Offline Provider**: A deterministic feature-hashing embedder that needs no model files
//! - **Normalized Output**: Every provider returns L2-normalized vectors
//!
//! ## Quick Start
//!
//! ```no_run
//! use docqa_embed::{EmbedConfig, create_provider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = create_provider(&EmbedConfig::default()).await?;
//!
//! let texts = vec!["Hello world".to_string(), "How are you?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: Provider selection and model settings
//! - [`provider`]: The [`EmbeddingProvider`] trait and the FastEmbed implementation
//! - [`hashing`]: The feature-hashing provider
//! - [`error`]: Error types and result handling
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.
//! Shape problems (wrong dimension, wrong row count, non-finite values) have
//! their own variants carrying expected and actual sizes.

pub mod config;
pub mod error;
pub mod hashing;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_DIMENSION, DEFAULT_MODEL_NAME, EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use hashing::HashingEmbedProvider;
pub use provider::{
    EmbeddingProvider, EmbeddingResult, FastEmbedProvider, create_provider, normalize_in_place,
};
