//! Embedding orchestration: one batched call per ingestion or query, with the
//! provider's output checked for shape before anything downstream sees it.

use crate::error::Result;
use docqa_embed::{EmbedError, EmbeddingProvider, normalize_in_place};
use std::sync::Arc;

/// A `rows.len() × dimension` matrix of unit-norm embeddings
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub dimension: usize,
    pub rows: Vec<Vec<f32>>,
}

impl EmbeddingMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone)]
pub struct EmbeddingOrchestrator {
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for EmbeddingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingOrchestrator")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_name())
            .field("dimension", &self.provider.embedding_dimension())
            .finish()
    }
}

impl EmbeddingOrchestrator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn dimension(&self) -> usize {
        self.provider.embedding_dimension()
    }

    /// Embed `texts` in one provider call.
    ///
    /// Fails with an embedding error if the provider returns the wrong number
    /// of rows, a row of the wrong dimension, or non-finite values. Rows are
    /// re-normalized so the index can rely on unit norm whatever the provider.
    pub async fn embed(&self, texts: &[String]) -> Result<EmbeddingMatrix> {
        let expected_dimension = self.dimension();
        if texts.is_empty() {
            return Ok(EmbeddingMatrix {
                dimension: expected_dimension,
                rows: Vec::new(),
            });
        }

        tracing::debug!(
            "Embedding {} texts with {} ({})",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );
        let result = self.provider.embed_texts(texts).await?;

        if result.embeddings.len() != texts.len() {
            return Err(EmbedError::BatchSizeMismatch {
                expected: texts.len(),
                actual: result.embeddings.len(),
            }
            .into());
        }

        let mut rows = result.embeddings;
        for (row_index, row) in rows.iter_mut().enumerate() {
            if row.len() != expected_dimension {
                return Err(EmbedError::DimensionMismatch {
                    expected: expected_dimension,
                    actual: row.len(),
                }
                .into());
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(EmbedError::NonFinite { row: row_index }.into());
            }
            normalize_in_place(row);
        }

        Ok(EmbeddingMatrix {
            dimension: expected_dimension,
            rows,
        })
    }

    /// Embed a single query as a one-row batch.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let matrix = self.embed(&[query.to_string()]).await?;
        matrix.rows.into_iter().next().ok_or_else(|| {
            EmbedError::BatchSizeMismatch {
                expected: 1,
                actual: 0,
            }
            .into()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::RetrieverError;
    use async_trait::async_trait;
    use docqa_embed::{EmbeddingResult, HashingEmbedProvider};

    /// A provider that returns whatever rows it was built with.
    pub(crate) struct CannedProvider {
        pub dimension: usize,
        pub rows: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CannedProvider {
        async fn embed_texts(&self, _texts: &[String]) -> docqa_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult {
                embeddings: self.rows.clone(),
                dimension: self.dimension,
            })
        }

        fn embedding_dimension(&self) -> usize {
            self.dimension
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn test_rows_are_unit_norm() {
        let orchestrator = EmbeddingOrchestrator::new(Arc::new(CannedProvider {
            dimension: 2,
            rows: vec![vec![3.0, 4.0], vec![0.0, 2.0]],
        }));
        let matrix = orchestrator.embed(&texts(2)).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert!((matrix.rows[0][0] - 0.6).abs() < 1e-6);
        assert_eq!(matrix.rows[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_shape_errors() {
        let short = EmbeddingOrchestrator::new(Arc::new(CannedProvider {
            dimension: 2,
            rows: vec![vec![1.0, 0.0]],
        }));
        let err = short.embed(&texts(2)).await.unwrap_err();
        assert!(matches!(
            err,
            RetrieverError::EmbeddingFailure {
                source: EmbedError::BatchSizeMismatch {
                    expected: 2,
                    actual: 1
                }
            }
        ));

        let wide = EmbeddingOrchestrator::new(Arc::new(CannedProvider {
            dimension: 2,
            rows: vec![vec![1.0, 0.0, 0.0]],
        }));
        let err = wide.embed(&texts(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RetrieverError::EmbeddingFailure {
                source: EmbedError::DimensionMismatch {
                    expected: 2,
                    actual: 3
                }
            }
        ));

        let nan = EmbeddingOrchestrator::new(Arc::new(CannedProvider {
            dimension: 2,
            rows: vec![vec![f32::NAN, 0.0]],
        }));
        assert!(nan.embed(&texts(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_embed_query_uses_provider() {
        let provider = Arc::new(HashingEmbedProvider::new(64, 8));
        let orchestrator = EmbeddingOrchestrator::new(provider.clone());
        let query = orchestrator.embed_query("What color is the sky?").await.unwrap();
        let direct = provider.embed_sync("What color is the sky?");
        assert_eq!(query.len(), 64);
        assert!(query.iter().zip(&direct).all(|(a, b)| (a - b).abs() < 1e-6));
        assert!(orchestrator.embed(&[]).await.unwrap().is_empty());
    }
}
