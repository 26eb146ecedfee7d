//! End-to-end scenarios for ingestion and retrieval
//!
//! All tests use the hashing embedder so they run offline and deterministically:
//! - Ingesting, querying and the typed failures around a missing index
//! - Threshold behavior (zero results, monotonicity)
//! - Re-ingestion idempotence and generation swaps
//! - Detection of damaged artifacts on load

use anyhow::Result;
use docqa_embed::HashingEmbedProvider;
use docqa_retriever::ann::IndexKind;
use docqa_retriever::retrieval::documents::{ExtractorRegistry, load_documents_from_paths};
use docqa_retriever::retrieval::retriever::search_generation;
use docqa_retriever::storage::metadata::{ChunkRecord, MetadataStore};
use docqa_retriever::{
    Document, DocumentIndex, IndexConfig, PERMISSIVE_THRESHOLD, RetrieverConfig, RetrieverError,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const DIMENSION: usize = 1024;

fn open_index(root: &Path, chunk_size: usize, overlap: usize) -> DocumentIndex {
    open_index_with(RetrieverConfig::new(root.join("index")).with_chunking(chunk_size, overlap))
}

fn open_index_with(config: RetrieverConfig) -> DocumentIndex {
    DocumentIndex::with_provider(config, Arc::new(HashingEmbedProvider::new(DIMENSION, 16)))
        .expect("valid test configuration")
}

/// Documents whose words are all distinct, so every chunk has its own token set.
fn synthetic_corpus(documents: usize, words: usize) -> Vec<Document> {
    (0..documents)
        .map(|d| {
            let text = (0..words)
                .map(|w| format!("term{d}x{w}"))
                .collect::<Vec<_>>()
                .join(" ");
            Document::new(format!("doc{d}.txt"), text)
        })
        .collect()
}

#[tokio::test]
async fn test_sky_scenario() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 20, 5);

    let report = index
        .ingest(vec![Document::new(
            "nature.txt",
            "The sky is blue. The grass is green.",
        )])
        .await?;
    assert!(report.chunks >= 2);

    let generation = index.live_index().get().await?;
    let source = "The sky is blue. The grass is green.";
    for record in generation.metadata.iter() {
        let start = source.find(&record.text).expect("chunk is a substring");
        let end = start + record.text.len();
        assert!(
            end == source.len() || source[end..].starts_with(char::is_whitespace),
            "chunk {:?} splits a word",
            record.text
        );
    }

    let results = index
        .retrieve("What color is the sky?", 1, PERMISSIVE_THRESHOLD)
        .await?;
    assert_eq!(results.len(), 1);
    assert!(results[0].text.contains("sky"));
    assert_eq!(results[0].source, "nature.txt");
    assert_eq!(results[0].chunk_id, "nature.txt_chunk_0");
    Ok(())
}

#[tokio::test]
async fn test_empty_corpus() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 400, 50);

    let err = index.ingest(vec![]).await.unwrap_err();
    assert!(matches!(err, RetrieverError::EmptyCorpus));

    let err = index
        .ingest(vec![Document::new("blank.txt", " \n\t ")])
        .await
        .unwrap_err();
    assert!(matches!(err, RetrieverError::EmptyCorpus));
    assert!(!temp_dir.path().join("index").exists());
    Ok(())
}

#[tokio::test]
async fn test_retrieve_before_ingest() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 400, 50);

    let err = index.retrieve("anything", 5, 0.0).await.unwrap_err();
    assert!(matches!(err, RetrieverError::IndexUnavailable { .. }));
    assert!(err.is_missing_index());
    assert!(!index.live_index().is_loaded().await);
    Ok(())
}

#[tokio::test]
async fn test_zero_results_and_threshold_monotonicity() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 60, 10);
    index.ingest(synthetic_corpus(3, 40)).await?;

    let query = "term1x4 term1x5 term1x6 term2x30";
    let none = index.retrieve(query, 10, 1.01).await?;
    assert!(none.is_empty());

    let mut previous = usize::MAX;
    for threshold in [-100.0, -0.5, 0.0, 0.05, 0.1, 0.2, 0.4, 0.8, 1.01] {
        let results = index.retrieve(query, 10, threshold).await?;
        assert!(results.len() <= previous, "threshold {threshold} grew the result set");
        assert!(results.iter().all(|r| r.score >= threshold));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        previous = results.len();
    }

    let permissive = index.retrieve(query, 10, PERMISSIVE_THRESHOLD).await?;
    assert_eq!(permissive.len(), 10);
    Ok(())
}

#[tokio::test]
async fn test_reingest_is_idempotent() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 50, 10);
    let corpus = synthetic_corpus(2, 50);

    let first = index.ingest(corpus.clone()).await?;
    let first_metadata = MetadataStore::read_from(&temp_dir.path().join("index/metadata.json"))?;
    let second = index.ingest(corpus).await?;
    let second_metadata = MetadataStore::read_from(&temp_dir.path().join("index/metadata.json"))?;

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first_metadata, second_metadata);
    assert_eq!(first.checksum, second.checksum);
    Ok(())
}

#[tokio::test]
async fn test_positions_resolve_to_their_metadata() -> Result<()> {
    let embedder = HashingEmbedProvider::new(DIMENSION, 16);
    for kind in [IndexKind::Hnsw, IndexKind::IvfFlat, IndexKind::Flat] {
        let temp_dir = tempdir()?;
        let config = RetrieverConfig::new(temp_dir.path().join("index"))
            .with_chunking(40, 10)
            .with_index(
                IndexConfig::new(temp_dir.path().join("index"))
                    .with_kind(kind)
                    .with_ivf(4, 4),
            );
        let index = open_index_with(config);
        index.ingest(synthetic_corpus(3, 30)).await?;

        // A fresh handle forces a load from disk.
        index.invalidate_index().await;
        let generation = index.live_index().get().await?;
        assert!(generation.metadata.len() > 10);

        for record in generation.metadata.iter() {
            let query = embedder.embed_sync(&record.text);
            let hits = search_generation(&generation, &query, 1, PERMISSIVE_THRESHOLD)?;
            assert_eq!(hits[0].chunk_id, record.chunk_id, "{kind} misplaced a chunk");
            assert!((hits[0].score - 1.0).abs() < 1e-4);
        }
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_load_once() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = Arc::new(open_index(temp_dir.path(), 60, 10));
    index.ingest(synthetic_corpus(2, 40)).await?;
    assert_eq!(index.live_index().load_count(), 0);

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let index = Arc::clone(&index);
            tokio::spawn(async move { index.retrieve(&format!("term0x{i}"), 3, 0.0).await })
        })
        .collect();
    for handle in handles {
        assert!(!handle.await??.is_empty());
    }
    assert_eq!(index.live_index().load_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_ingest_swaps_generation() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 400, 50);

    index
        .ingest(vec![Document::new("old.txt", "apples and oranges")])
        .await?;
    let before = index.retrieve("apples", 5, PERMISSIVE_THRESHOLD).await?;
    assert_eq!(before[0].source, "old.txt");
    let held = index.live_index().get().await?;

    index
        .ingest(vec![Document::new("new.txt", "bananas and cherries")])
        .await?;
    let after = index.retrieve("bananas", 5, PERMISSIVE_THRESHOLD).await?;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].source, "new.txt");
    assert_eq!(index.live_index().load_count(), 2);

    // A query that began before the swap keeps its generation.
    assert_eq!(held.metadata.get(0).map(|r| r.source.as_str()), Some("old.txt"));
    Ok(())
}

#[tokio::test]
async fn test_damaged_artifacts_are_reported() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = open_index(temp_dir.path(), 60, 10);
    index.ingest(synthetic_corpus(2, 30)).await?;
    let index_path = temp_dir.path().join("index/index.bin");
    let metadata_path = temp_dir.path().join("index/metadata.json");

    // One record too many
    let mut records: Vec<ChunkRecord> = serde_json::from_slice(&std::fs::read(&metadata_path)?)?;
    let original = records.clone();
    records.push(records[0].clone());
    std::fs::write(&metadata_path, serde_json::to_vec_pretty(&records)?)?;
    index.invalidate_index().await;
    let err = index.retrieve("term0x1", 3, 0.0).await.unwrap_err();
    assert!(matches!(err, RetrieverError::IndexCorrupt { .. }), "{err}");

    // Metadata gone
    std::fs::remove_file(&metadata_path)?;
    let err = index.retrieve("term0x1", 3, 0.0).await.unwrap_err();
    assert!(matches!(err, RetrieverError::MetadataMissing { .. }), "{err}");

    // Index payload flipped
    std::fs::write(&metadata_path, serde_json::to_vec_pretty(&original)?)?;
    let mut bytes = std::fs::read(&index_path)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&index_path, &bytes)?;
    let err = index.retrieve("term0x1", 3, 0.0).await.unwrap_err();
    assert!(matches!(err, RetrieverError::IndexCorrupt { .. }), "{err}");

    assert!(!index.live_index().is_loaded().await);
    Ok(())
}

#[tokio::test]
async fn test_partial_extraction_failures() -> Result<()> {
    let temp_dir = tempdir()?;
    let uploads = temp_dir.path().join("uploads");
    std::fs::create_dir_all(&uploads)?;
    std::fs::write(uploads.join("notes.md"), "Quarterly revenue grew by ten percent.")?;
    std::fs::write(uploads.join("slides.pptx"), [0x50, 0x4b, 0x03, 0x04])?;

    let index = open_index(temp_dir.path(), 400, 50);
    let documents = load_documents_from_paths(
        &[uploads.join("notes.md"), uploads.join("slides.pptx")],
        &ExtractorRegistry::default(),
    );
    let report = index.ingest(documents).await?;
    assert_eq!(report.documents, 1);

    let only_failures = load_documents_from_paths(
        &[uploads.join("slides.pptx"), uploads.join("missing.txt")],
        &ExtractorRegistry::default(),
    );
    let err = index.ingest(only_failures).await.unwrap_err();
    assert!(matches!(err, RetrieverError::EmptyCorpus));

    // The failed ingestion left the earlier generation in place.
    let hits = index.retrieve("revenue", 1, 0.0).await?;
    assert_eq!(hits[0].source, "notes.md");
    Ok(())
}
