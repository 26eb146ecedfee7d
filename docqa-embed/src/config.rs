//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model used when no model is configured.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Output dimension of the default model. Also the default for the hashing provider.
pub const DEFAULT_DIMENSION: usize = 384;

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Local ONNX model through fastembed
    FastEmbed,
    /// Deterministic feature hashing, no model download
    Hashing,
}

/// Configuration for embedding providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend used to produce embeddings
    pub provider: ProviderKind,
    /// Name of the embedding model to use
    pub model_name: String,
    /// Maximum number of texts sent to the model in one call
    pub batch_size: usize,
    /// Output dimension of the hashing provider. Ignored by model-backed providers,
    /// whose dimension is discovered at load time.
    pub dimension: usize,
    /// Where downloaded model files are cached
    pub cache_dir: Option<PathBuf>,
}

impl EmbedConfig {
    /// Create a configuration for a named fastembed model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Create a configuration for the hashing provider with the given dimension
    pub fn hashing(dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Hashing,
            model_name: "feature-hashing".to_string(),
            dimension,
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir(self, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..self
        }
    }

    /// Get the model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Check the configuration for values no provider can work with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        if self.provider == ProviderKind::Hashing && self.dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing provider needs a non-zero dimension",
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        tracing::debug!("Embedding configuration valid for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::FastEmbed,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            batch_size: 32,
            dimension: DEFAULT_DIMENSION,
            cache_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbedConfig::default();

        assert_eq!(config.provider, ProviderKind::FastEmbed);
        assert_eq!(config.model_name(), "all-MiniLM-L6-v2");
        assert_eq!(config.batch_size, 32);
        assert!(config.cache_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_methods() {
        let config = EmbedConfig::new("bge-small-en-v1.5")
            .with_batch_size(8)
            .with_cache_dir("/tmp/models");

        assert_eq!(config.model_name, "bge-small-en-v1.5");
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/models")));
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(EmbedConfig::default().with_batch_size(0).validate().is_err());
        assert!(EmbedConfig::hashing(0).validate().is_err());
        assert!(EmbedConfig::hashing(64).validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: EmbedConfig =
            serde_json::from_str(r#"{"provider": "hashing", "dimension": 128}"#).unwrap();

        assert_eq!(config.provider, ProviderKind::Hashing);
        assert_eq!(config.dimension, 128);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
    }
}
