//! Background prefetch worker.
//!
//! One thread per cache. Each cycle it sweeps the window around the current
//! position, decodes whatever is missing, trims the cache once it grows past
//! the cleanup threshold, then waits for a wake-up or the poll interval.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use super::cache::Shared;
use super::window::window_order;

enum Sweep {
    Complete,
    /// Position or window size changed mid-sweep.
    Moved,
    Stopped,
}

/// Handle to a running prefetch thread.
pub(super) struct PrefetchWorker {
    handle: JoinHandle<()>,
    stopped: Arc<AtomicBool>,
    /// Disconnects when the thread exits, including by panic.
    exited: Receiver<()>,
}

impl PrefetchWorker {
    pub(super) fn spawn(
        shared: Arc<Shared>,
        wake_rx: Receiver<()>,
        interval: Duration,
    ) -> io::Result<Self> {
        let stopped = Arc::new(AtomicBool::new(false));
        let (exit_tx, exited) = flume::bounded::<()>(0);

        let handle = {
            let stopped = Arc::clone(&stopped);
            thread::Builder::new()
                .name("prefetch-worker".into())
                .spawn(move || {
                    let _exit_tx = exit_tx;
                    worker_loop(&shared, &stopped, &wake_rx, interval);
                })?
        };

        debug!(?interval, "Started prefetch worker");

        Ok(Self {
            handle,
            stopped,
            exited,
        })
    }

    pub(super) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Fences the worker off from the cache, then waits up to `timeout` for it to exit.
    pub(super) fn stop(self, shared: &Shared, wake_tx: &Sender<()>, timeout: Duration) {
        {
            let _state = shared.state.lock();
            self.stopped.store(true, Ordering::Release);
        }
        let _ = wake_tx.try_send(());

        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(?timeout, "Prefetch worker did not exit in time, detaching");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!("Prefetch worker panicked");
                }
                debug!("Prefetch worker stopped");
            }
        }
    }
}

fn worker_loop(shared: &Shared, stopped: &AtomicBool, wake_rx: &Receiver<()>, interval: Duration) {
    trace!("Prefetch worker running");

    loop {
        match sweep(shared, stopped) {
            Sweep::Stopped => break,
            Sweep::Moved => continue,
            Sweep::Complete => {}
        }

        let cleaned = shared.with_state_if_active(stopped, |state| {
            if shared.over_threshold(state) {
                shared.cleanup_locked(state);
            }
        });
        if cleaned.is_none() {
            break;
        }

        match wake_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if stopped.load(Ordering::Acquire) {
            break;
        }
    }

    trace!("Prefetch worker exiting");
}

/// Decodes every missing index in the current window, nearest first.
fn sweep(shared: &Shared, stopped: &AtomicBool) -> Sweep {
    let (sources, generation) = shared.snapshot();
    if sources.is_empty() {
        return Sweep::Complete;
    }

    let position = shared.position();
    let cache_size = shared.cache_size();

    for index in window_order(position, cache_size, sources.len()) {
        if stopped.load(Ordering::Acquire) {
            return Sweep::Stopped;
        }
        if shared.position() != position || shared.cache_size() != cache_size {
            trace!(position, "Window moved, restarting sweep");
            return Sweep::Moved;
        }
        if !shared.needs_decode(index) {
            continue;
        }

        let path = &sources[index];
        let surface = shared.surface.get();
        let decoded = shared.decoder.decode(path, surface);

        let applied = shared.with_state_if_active(stopped, |state| {
            if state.generation != generation {
                return false;
            }
            match decoded {
                Ok(image) => {
                    state.entries.insert(index, Arc::new(image));
                    trace!(index, "Prefetched image");
                }
                Err(e) => {
                    warn!(index, ?path, error = %e, "Failed to prefetch image");
                    state.failed.insert(index);
                }
            }
            true
        });

        match applied {
            None => return Sweep::Stopped,
            Some(false) => {
                trace!(generation, "Sources replaced, restarting sweep");
                return Sweep::Moved;
            }
            Some(true) => {}
        }
    }

    Sweep::Complete
}
