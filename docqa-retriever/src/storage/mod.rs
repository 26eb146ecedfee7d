//! Durable storage for index generations
//!
//! A generation is two artifacts in one directory:
//!
//! ```text
//! <dir>/index.bin      binary ANN index (see `ann::codec`)
//! <dir>/metadata.json  ordered chunk records, position i = vector i
//! ```
//!
//! [`GenerationStore::persist`] never writes into the live directory. Both
//! artifacts are written into a staging directory next to it, flushed, and the
//! staging directory is then renamed into place. Readers observe either the
//! previous complete generation or the new one.

pub mod metadata;

use crate::ann::{AnnIndex, VectorIndex, codec};
use crate::error::{Result, RetrieverError};
use metadata::MetadataStore;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";

#[cfg(unix)]
const DEFAULT_DIR_MODE: u32 = 0o755;

/// One loaded, internally consistent (index + metadata) snapshot
#[derive(Debug)]
pub struct Generation {
    pub index: VectorIndex,
    pub metadata: MetadataStore,
    /// blake3 checksum of the index payload, identifying this generation
    pub checksum: [u8; 32],
}

impl Generation {
    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }
}

/// Reads and writes generations under one index directory.
#[derive(Debug, Clone)]
pub struct GenerationStore {
    dir: PathBuf,
}

impl GenerationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn exists(&self) -> bool {
        self.index_path().is_file()
    }

    fn parent_and_name(&self) -> Result<(PathBuf, String)> {
        let name = self
            .dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RetrieverError::invalid_config(format!(
                    "index directory {} has no usable final component",
                    self.dir.display()
                ))
            })?
            .to_string();
        let parent = match self.dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((parent, name))
    }

    /// Write a new generation and swap it in for the current one.
    ///
    /// Returns the checksum of the persisted index payload.
    pub fn persist(&self, index: &VectorIndex, metadata: &MetadataStore) -> Result<[u8; 32]> {
        if index.len() != metadata.len() {
            return Err(RetrieverError::corrupt(format!(
                "refusing to persist {} vectors with {} metadata records",
                index.len(),
                metadata.len()
            )));
        }

        let (parent, name) = self.parent_and_name()?;
        std::fs::create_dir_all(&parent)?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{name}.staging-"))
            .tempdir_in(&parent)?;

        let bytes = codec::encode(index);
        let checksum = codec::checksum(&bytes).map_err(|e| RetrieverError::corrupt(e.to_string()))?;
        {
            let mut file = std::fs::File::create(staging.path().join(INDEX_FILE))?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        metadata.write_to(&staging.path().join(METADATA_FILE))?;
        tracing::debug!(
            "Staged generation at {} ({} bytes of index)",
            staging.path().display(),
            bytes.len()
        );

        // tempfile creates the staging directory owner-only; the live directory
        // keeps the previous generation's mode, or a world-readable default.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&self.dir)
                .map(|m| m.permissions().mode() & 0o7777)
                .unwrap_or(DEFAULT_DIR_MODE);
            std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(mode))?;
        }

        // From here on the staging directory must outlive its guard.
        let staged = staging.keep();

        let retired = if self.dir.exists() {
            let retired = parent.join(format!(
                ".{name}.retired-{}",
                chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
            ));
            std::fs::rename(&self.dir, &retired)?;
            Some(retired)
        } else {
            None
        };

        if let Err(e) = std::fs::rename(&staged, &self.dir) {
            tracing::error!("Failed to move new generation into {}: {}", self.dir.display(), e);
            if let Some(retired) = &retired {
                if let Err(restore) = std::fs::rename(retired, &self.dir) {
                    tracing::error!(
                        "Could not restore previous generation from {}: {}",
                        retired.display(),
                        restore
                    );
                }
            }
            let _ = std::fs::remove_dir_all(&staged);
            return Err(e.into());
        }

        if let Some(retired) = retired {
            if let Err(e) = std::fs::remove_dir_all(&retired) {
                tracing::warn!(
                    "Could not remove retired generation {}: {}",
                    retired.display(),
                    e
                );
            }
        }

        tracing::info!(
            "Persisted generation of {} vectors to {}",
            index.len(),
            self.dir.display()
        );
        Ok(checksum)
    }

    /// Read the current generation from disk and apply the search-time breadth.
    pub fn load(&self, search_breadth: usize) -> Result<Generation> {
        let index_path = self.index_path();
        let bytes = match std::fs::read(&index_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RetrieverError::IndexUnavailable { path: index_path });
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = MetadataStore::read_from(&self.metadata_path())?;

        let mut index = codec::decode(&bytes).map_err(|e| {
            RetrieverError::corrupt(format!("{}: {e}", index_path.display()))
        })?;
        let checksum = codec::checksum(&bytes).map_err(|e| RetrieverError::corrupt(e.to_string()))?;

        if index.len() != metadata.len() {
            return Err(RetrieverError::corrupt(format!(
                "index holds {} vectors but metadata has {} records",
                index.len(),
                metadata.len()
            )));
        }

        index.set_search_breadth(search_breadth);
        tracing::info!(
            "Loaded {} index with {} vectors from {}",
            index.kind(),
            index.len(),
            self.dir.display()
        );

        Ok(Generation {
            index,
            metadata,
            checksum,
        })
    }
}
