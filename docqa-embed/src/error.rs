//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Covers configuration mistakes, model loading failures, runtime failures
/// during embedding generation, and shape problems in what a model returned.
/// Shape variants carry the expected and actual sizes so callers can report
/// them without parsing messages.
///
/// # Error Categories
///
/// - **Configuration Errors**: Invalid settings or unknown model names
/// - **Initialization Errors**: Failures during model loading
/// - **Runtime Errors**: Problems during embedding generation
/// - **Shape Errors**: Output that does not match the request or the model's dimension
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The configured model name is not one the provider knows how to load
    #[error("Unknown embedding model: {name}")]
    UnknownModel { name: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model handle cannot be used, e.g. a previous call panicked while holding it
    #[error("Embedding model unavailable: {message}")]
    ModelUnavailable { message: String },

    /// A vector came back with the wrong number of components
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The model returned a different number of vectors than texts were sent
    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    BatchSizeMismatch { expected: usize, actual: usize },

    /// A vector contained NaN or infinity
    #[error("Embedding contains non-finite values at row {row}")]
    NonFinite { row: usize },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl EmbedError {
    /// Create a model initialization error from any error type.
    pub fn model_init(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Create an embedding generation error from any error type.
    pub fn embedding_gen(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    ///
    /// # Arguments
    /// * `message` - A descriptive error message explaining what's wrong with the configuration
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = EmbedError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 768"
        );
    }

    #[test]
    fn test_wrapped_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "model.onnx");
        let err = EmbedError::model_init(io);
        assert!(matches!(err, EmbedError::ModelInitialization { .. }));
        assert!(err.to_string().contains("model.onnx"));
        assert!(std::error::Error::source(&err).is_some());

        let err = EmbedError::embedding_gen(anyhow::anyhow!("onnx session failed"));
        assert!(matches!(err, EmbedError::EmbeddingGeneration { .. }));
        assert_eq!(
            err.to_string(),
            "Embedding generation failed: onnx session failed"
        );
    }
}
