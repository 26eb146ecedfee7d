//! The live handle on the current generation.
//!
//! `Unloaded ⇄ Loaded`: the first [`LiveIndex::get`] loads the generation from
//! disk, [`LiveIndex::invalidate`] drops it, and the next `get` loads again.
//! Concurrent first callers share one load; a failed load leaves the handle
//! unloaded so the next caller retries.

use crate::error::Result;
use crate::storage::{Generation, GenerationStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OnceCell, RwLock};

#[derive(Debug)]
pub struct LiveIndex {
    store: GenerationStore,
    search_breadth: usize,
    slot: RwLock<Arc<OnceCell<Arc<Generation>>>>,
    load_count: AtomicUsize,
}

impl LiveIndex {
    /// `search_breadth` is applied to every generation as it is loaded.
    pub fn new(store: GenerationStore, search_breadth: usize) -> Self {
        Self {
            store,
            search_breadth,
            slot: RwLock::new(Arc::new(OnceCell::new())),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &GenerationStore {
        &self.store
    }

    /// The current generation, loading it if the handle is unloaded.
    pub async fn get(&self) -> Result<Arc<Generation>> {
        let cell = Arc::clone(&*self.slot.read().await);
        let generation = cell
            .get_or_try_init(|| async {
                let store = self.store.clone();
                let breadth = self.search_breadth;
                let generation =
                    tokio::task::spawn_blocking(move || store.load(breadth)).await??;
                self.load_count.fetch_add(1, Ordering::SeqCst);
                Ok::<_, crate::error::RetrieverError>(Arc::new(generation))
            })
            .await?;
        Ok(Arc::clone(generation))
    }

    /// Drop the loaded generation. Callers holding an `Arc` keep using it;
    /// new callers load whatever is on disk now.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.write().await;
        if slot.initialized() {
            tracing::info!("Invalidating live index at {}", self.store.dir().display());
        }
        *slot = Arc::new(OnceCell::new());
    }

    pub async fn is_loaded(&self) -> bool {
        self.slot.read().await.initialized()
    }

    /// How many times a generation has been read from disk.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }
}
