//! Per-backend resource cache keyed by model directory.
//!
//! Each key owns a single-flight [`OnceCell`]: concurrent misses for the same
//! directory wait on one loader call and share the resulting [`Arc`]. A load
//! that fails leaves no entry behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::telemetry::{CACHE_HITS_TOTAL, CACHE_LOADS_TOTAL};
use crate::types::{Result, TranscriptionError};

type Slot<R> = Arc<OnceCell<Arc<R>>>;

/// Loaded resources for one backend, at most one set per directory.
pub struct ResourceCache<R> {
    name: &'static str,
    entries: Mutex<HashMap<PathBuf, Slot<R>>>,
}

impl<R> std::fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("name", &self.name)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

impl<R: Send + Sync + 'static> ResourceCache<R> {
    /// Empty cache; `name` labels logs and metrics.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the resources for `dir`, running `loader` on a blocking thread
    /// if nothing is loaded yet.
    pub async fn get_or_load<F>(&self, dir: &Path, loader: F) -> Result<Arc<R>>
    where
        F: FnOnce(&Path) -> Result<R> + Send + 'static,
    {
        let slot = self.slot(dir);
        if let Some(resources) = slot.get() {
            metrics::counter!(CACHE_HITS_TOTAL, "cache" => self.name).increment(1);
            return Ok(Arc::clone(resources));
        }

        let owned_dir = dir.to_path_buf();
        let name = self.name;
        let loaded = slot
            .get_or_try_init(|| async move {
                debug!(cache = name, dir = %owned_dir.display(), "loading resources");
                metrics::counter!(CACHE_LOADS_TOTAL, "cache" => name).increment(1);
                let resources = tokio::task::spawn_blocking(move || loader(&owned_dir))
                    .await
                    .map_err(|e| {
                        TranscriptionError::LoadFailure(format!("loader task failed: {e}"))
                    })??;
                Ok::<_, TranscriptionError>(Arc::new(resources))
            })
            .await;

        match loaded {
            Ok(resources) => Ok(Arc::clone(resources)),
            Err(e) => {
                warn!(cache = self.name, dir = %dir.display(), error = %e, "resource load failed");
                self.discard_if_empty(dir, &slot);
                Err(e)
            }
        }
    }

    /// Drop the loaded entry for `dir`. Returns whether one existed.
    ///
    /// A load still in flight is left in place so waiting callers keep
    /// sharing it.
    pub fn invalidate(&self, dir: &Path) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(dir).is_some_and(|slot| slot.initialized()) {
            let _ = entries.remove(dir);
            return true;
        }
        false
    }

    /// Drop every loaded entry. Loads in flight are kept.
    pub fn clear(&self) {
        self.entries.lock().retain(|_, slot| !slot.initialized());
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Whether no entry is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether resources for `dir` are loaded.
    pub fn contains(&self, dir: &Path) -> bool {
        self.entries
            .lock()
            .get(dir)
            .is_some_and(|slot| slot.initialized())
    }

    fn slot(&self, dir: &Path) -> Slot<R> {
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(dir.to_path_buf()).or_default())
    }

    fn discard_if_empty(&self, dir: &Path, slot: &Slot<R>) {
        let mut entries = self.entries.lock();
        if entries
            .get(dir)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized())
        {
            let _ = entries.remove(dir);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
