//! Look-ahead cache of display-ready images keyed by slideshow index.
//!
//! - Entries live in a map guarded by one mutex, shared with the prefetch worker
//! - Position and window size are atomics read at the start of every sweep
//! - Eviction is lazy: entries outside the window survive until a cleanup pass

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::decoder::ImageDecoder;
use super::fit::DisplayImage;
use super::surface::SurfaceSize;
use super::window::window_set;
use super::worker::PrefetchWorker;
use crate::config::{PREFETCH_INTERVAL, STOP_TIMEOUT};
use crate::error::CacheError;

/// Cleanup runs once the entry count exceeds this multiple of the cache size.
const CLEANUP_FACTOR: usize = 2;

/// Mutable cache contents. Only ever touched with [`Shared::state`] held.
pub(super) struct CacheState {
    pub(super) sources: Arc<[PathBuf]>,
    pub(super) entries: HashMap<usize, Arc<DisplayImage>>,
    /// Indices the worker failed to decode; skipped until invalidated.
    pub(super) failed: HashSet<usize>,
    /// Bumped whenever `sources` is replaced so in-flight decodes can be discarded.
    pub(super) generation: u64,
}

/// State shared between the cache handle and its prefetch worker.
pub(super) struct Shared {
    pub(super) decoder: Arc<dyn ImageDecoder>,
    pub(super) surface: SurfaceSize,
    pub(super) state: Mutex<CacheState>,
    position: AtomicUsize,
    cache_size: AtomicUsize,
}

impl Shared {
    pub(super) fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    pub(super) fn cache_size(&self) -> usize {
        self.cache_size.load(Ordering::Acquire)
    }

    /// Current sources and their generation.
    pub(super) fn snapshot(&self) -> (Arc<[PathBuf]>, u64) {
        let state = self.state.lock();
        (Arc::clone(&state.sources), state.generation)
    }

    pub(super) fn needs_decode(&self, index: usize) -> bool {
        let state = self.state.lock();
        !state.entries.contains_key(&index) && !state.failed.contains(&index)
    }

    /// Runs `f` on the state unless `stopped` is set.
    ///
    /// The flag is read under the lock, so once a stopper has set it while
    /// holding the lock, `f` can never run again for that worker.
    pub(super) fn with_state_if_active<R>(
        &self,
        stopped: &AtomicBool,
        f: impl FnOnce(&mut CacheState) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        if stopped.load(Ordering::Acquire) {
            return None;
        }
        Some(f(&mut state))
    }

    /// Drops every entry outside the window around the current position.
    pub(super) fn cleanup_locked(&self, state: &mut CacheState) -> usize {
        let keep = window_set(self.position(), self.cache_size(), state.sources.len());
        let before = state.entries.len();
        state.entries.retain(|index, _| keep.contains(index));
        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(removed, kept = state.entries.len(), "Cleaned up cache");
        }
        removed
    }

    pub(super) fn over_threshold(&self, state: &CacheState) -> bool {
        state.entries.len() > self.cache_size() * CLEANUP_FACTOR
    }
}

/// Bounded window of decoded images around the current slideshow position.
pub struct LookaheadCache {
    shared: Arc<Shared>,
    worker: Option<PrefetchWorker>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    prefetch_interval: Duration,
    stop_timeout: Duration,
}

impl LookaheadCache {
    pub fn new(decoder: Arc<dyn ImageDecoder>, surface: SurfaceSize, cache_size: usize) -> Self {
        let (wake_tx, wake_rx) = flume::bounded(1);
        let shared = Arc::new(Shared {
            decoder,
            surface,
            state: Mutex::new(CacheState {
                sources: Arc::from(Vec::new()),
                entries: HashMap::new(),
                failed: HashSet::new(),
                generation: 0,
            }),
            position: AtomicUsize::new(0),
            cache_size: AtomicUsize::new(cache_size),
        });

        Self {
            shared,
            worker: None,
            wake_tx,
            wake_rx,
            prefetch_interval: PREFETCH_INTERVAL,
            stop_timeout: STOP_TIMEOUT,
        }
    }

    pub fn with_prefetch_interval(mut self, interval: Duration) -> Self {
        self.prefetch_interval = interval;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Replaces the image sources, dropping every cached entry and resetting the position.
    pub fn set_sources(&self, sources: Vec<PathBuf>) {
        {
            let mut state = self.shared.state.lock();
            state.sources = Arc::from(sources);
            state.entries.clear();
            state.failed.clear();
            state.generation = state.generation.wrapping_add(1);
            self.shared.position.store(0, Ordering::Release);
            debug!(
                count = state.sources.len(),
                generation = state.generation,
                "Replaced cache sources"
            );
        }
        self.wake();
    }

    /// Number of source images.
    pub fn len(&self) -> usize {
        self.shared.state.lock().sources.len()
    }

    /// Returns the image at `index`, decoding it on this thread on a miss.
    pub fn get(&self, index: usize) -> Result<Arc<DisplayImage>, CacheError> {
        let (path, generation) = {
            let state = self.shared.state.lock();
            let len = state.sources.len();
            if len == 0 {
                return Err(CacheError::Empty);
            }
            if index >= len {
                return Err(CacheError::OutOfRange { index, len });
            }
            if let Some(image) = state.entries.get(&index) {
                trace!(index, "Cache hit");
                return Ok(Arc::clone(image));
            }
            (state.sources[index].clone(), state.generation)
        };

        trace!(index, ?path, "Cache miss, decoding");
        let surface = self.shared.surface.get();
        let image = self
            .shared
            .decoder
            .decode(&path, surface)
            .map(Arc::new)
            .map_err(|source| CacheError::Decode { index, source })?;

        let mut state = self.shared.state.lock();
        if state.generation == generation {
            state.failed.remove(&index);
            state.entries.insert(index, Arc::clone(&image));
        }
        Ok(image)
    }

    /// Moves the window to `index`, wrapped into `0..len`. No-op without sources.
    pub fn set_position(&self, index: i64) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let wrapped = index.rem_euclid(len as i64) as usize;
        self.shared.position.store(wrapped, Ordering::Release);
        trace!(position = wrapped, "Position updated");
        self.wake();
    }

    /// Starts the prefetch worker. Does nothing if it is already running and
    /// replaces a worker that has died.
    pub fn start_prefetch(&mut self) -> Result<(), CacheError> {
        if let Some(worker) = self.worker.take() {
            if worker.is_running() {
                self.worker = Some(worker);
                return Ok(());
            }
            warn!("Prefetch worker exited unexpectedly, restarting");
            worker.stop(&self.shared, &self.wake_tx, self.stop_timeout);
        }

        while self.wake_rx.try_recv().is_ok() {}

        let worker = PrefetchWorker::spawn(
            Arc::clone(&self.shared),
            self.wake_rx.clone(),
            self.prefetch_interval,
        )
        .map_err(CacheError::Spawn)?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Stops the prefetch worker.
    ///
    /// When this returns the worker can no longer modify the cache, even if it
    /// did not exit within the stop timeout.
    pub fn stop_prefetch(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop(&self.shared, &self.wake_tx, self.stop_timeout);
        }
    }

    /// Drops the entry at `index` so the next `get` decodes it again.
    pub fn invalidate(&self, index: usize) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            state.failed.remove(&index);
            state.entries.remove(&index).is_some()
        };
        trace!(index, removed, "Invalidated cache entry");
        self.wake();
        removed
    }

    /// Changes the window size and immediately evicts entries outside the new window.
    pub fn resize(&self, cache_size: usize) -> usize {
        self.shared.cache_size.store(cache_size, Ordering::Release);
        let removed = {
            let mut state = self.shared.state.lock();
            self.shared.cleanup_locked(&mut state)
        };
        debug!(cache_size, removed, "Resized cache window");
        self.wake();
        removed
    }

    pub fn cache_size(&self) -> usize {
        self.shared.cache_size()
    }

    /// Entry count at which the worker runs a cleanup pass.
    pub fn cleanup_threshold(&self) -> usize {
        self.cache_size() * CLEANUP_FACTOR
    }

    pub fn entry_count(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn memory_bytes(&self) -> usize {
        self.shared
            .state
            .lock()
            .entries
            .values()
            .map(|image| image.memory_bytes())
            .sum()
    }

    pub fn surface(&self) -> &SurfaceSize {
        &self.shared.surface
    }

    fn wake(&self) {
        // A pending wake-up already covers this one.
        let _ = self.wake_tx.try_send(());
    }
}

#[cfg(test)]
impl LookaheadCache {
    pub fn position(&self) -> usize {
        self.shared.position()
    }

    pub fn is_prefetching(&self) -> bool {
        self.worker.as_ref().is_some_and(PrefetchWorker::is_running)
    }

    /// Evicts every entry outside the current window. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut state = self.shared.state.lock();
        self.shared.cleanup_locked(&mut state)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.shared.state.lock().entries.contains_key(&index)
    }

    pub fn cached_indices(&self) -> std::collections::BTreeSet<usize> {
        self.shared.state.lock().entries.keys().copied().collect()
    }
}

impl Drop for LookaheadCache {
    fn drop(&mut self) {
        self.stop_prefetch();
    }
}
