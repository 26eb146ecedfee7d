//! Ordered chunk provenance, aligned 1:1 with index positions.

use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// Provenance of one indexed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source: String,
    pub text: String,
}

/// The deterministic id of the `ordinal`-th chunk of `source`.
pub fn chunk_id(source: &str, ordinal: usize) -> String {
    format!("{source}_chunk_{ordinal}")
}

/// Metadata of one generation. Position `i` describes index vector `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<ChunkRecord>,
}

impl MetadataStore {
    pub fn new(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, position: usize) -> Option<&ChunkRecord> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    /// Distinct source names, sorted.
    pub fn sources(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.source.as_str()).collect()
    }

    /// Write as a pretty-printed JSON array and flush it to disk.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.records)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetrieverError::MetadataMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let records: Vec<ChunkRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            RetrieverError::corrupt(format!("metadata at {} is unreadable: {e}", path.display()))
        })?;
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(source: &str, ordinal: usize, text: &str) -> ChunkRecord {
        ChunkRecord {
            chunk_id: chunk_id(source, ordinal),
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_chunk_id_format() {
        assert_eq!(chunk_id("report.pdf", 3), "report.pdf_chunk_3");
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("metadata.json");
        let store = MetadataStore::new(vec![
            record("a.txt", 0, "alpha"),
            record("b.txt", 0, "beta"),
            record("a.txt", 1, "gamma"),
        ]);
        store.write_to(&path)?;

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.starts_with("[\n"), "expected pretty JSON array");
        assert!(raw.contains("\"chunk_id\": \"a.txt_chunk_1\""));

        let loaded = MetadataStore::read_from(&path)?;
        assert_eq!(loaded, store);
        assert_eq!(loaded.get(2).map(|r| r.text.as_str()), Some("gamma"));
        assert_eq!(loaded.sources().into_iter().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
        Ok(())
    }

    #[test]
    fn test_missing_and_garbled_files() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("metadata.json");
        assert!(matches!(
            MetadataStore::read_from(&path),
            Err(RetrieverError::MetadataMissing { .. })
        ));

        std::fs::write(&path, b"{\"not\": \"an array\"}")?;
        assert!(matches!(
            MetadataStore::read_from(&path),
            Err(RetrieverError::IndexCorrupt { .. })
        ));
        Ok(())
    }
}
