//! Model session cache

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use model_registry::ModelConfig;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::session::SessionLoader;
use crate::InferenceError;

type LoadResult<S> = Result<Arc<S>, InferenceError>;
type Slot<S> = Arc<OnceCell<LoadResult<S>>>;

/// Lazily populated store of one session per model file.
///
/// The slot for a file is created before any load starts and holds the
/// outcome of that load, so concurrent requests for the same file await the
/// same attempt and share its result, failures included. A failed slot is
/// then evicted and the next request retries.
pub struct SessionCache<L: SessionLoader> {
    loader: L,
    slots: Mutex<HashMap<PathBuf, Slot<L::Session>>>,
}

impl<L: SessionLoader> SessionCache<L> {
    /// Create an empty cache backed by `loader`
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Return the cached session for `path`, loading it on first use
    pub async fn get_or_load(
        &self,
        path: &Path,
        model: &ModelConfig,
    ) -> Result<Arc<L::Session>, InferenceError> {
        let slot = Arc::clone(self.lock().entry(path.to_path_buf()).or_default());

        if let Some(Ok(session)) = slot.get() {
            debug!("Session cache hit for {}", path.display());
            return Ok(Arc::clone(session));
        }

        let result = slot
            .get_or_init(|| async {
                info!("Loading model session for {} from {}", model.id, path.display());
                let start = Instant::now();
                let session = self.loader.load(path, model).await?;
                info!(
                    "Model {} loaded in {}ms",
                    model.id,
                    start.elapsed().as_millis()
                );
                Ok(Arc::new(session))
            })
            .await;

        match result {
            Ok(session) => Ok(Arc::clone(session)),
            Err(e) => {
                self.evict(path, &slot);
                Err(e.clone())
            }
        }
    }

    /// Whether a loaded session exists for `path`
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().get(path).is_some_and(is_loaded)
    }

    /// Number of loaded sessions
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| is_loaded(slot)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached session; returns how many were loaded.
    ///
    /// Loads still in flight finish for the requests already awaiting them,
    /// but their sessions are not retained: the next request for that file
    /// starts a fresh load, and the orphaned session is released once its
    /// last holder drops it.
    pub fn clear(&self) -> usize {
        let mut slots = self.lock();
        let loaded = slots.values().filter(|slot| is_loaded(slot)).count();
        slots.clear();
        info!("Session cache cleared ({} sessions released)", loaded);
        loaded
    }

    // Only removes `slot` if it is still the one registered for `path`
    fn evict(&self, path: &Path, slot: &Slot<L::Session>) {
        let mut slots = self.lock();
        if slots.get(path).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            debug!("Evicting failed session slot for {}", path.display());
            slots.remove(path);
        }
    }

    // The map is only mutated with plain inserts, removals and clears, so a
    // poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Slot<L::Session>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_loaded<S>(slot: &Slot<S>) -> bool {
    matches!(slot.get(), Some(Ok(_)))
}
