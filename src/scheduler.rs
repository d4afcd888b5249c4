//! Cancellable delayed tasks and request generations.
//!
//! A [`Debouncer`] holds at most one pending timer; scheduling again aborts the
//! pending timer and starts a fresh one. A [`GenerationCounter`] tags each
//! issued request so late responses from superseded requests can be dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Locks `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Strictly increasing tag for issued asynchronous requests.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: AtomicU64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next generation (starting at 1).
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued generation, 0 if none.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        generation == self.latest()
    }
}

/// Trailing-edge debounce for one class of operation.
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Runs `task` after the quiet period unless rescheduled or cancelled first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        if let Some(handle) = pending.take() {
            if !handle.is_finished() {
                debug!(operation = self.name, "Restarting debounce timer");
            }
            handle.abort();
        }

        let delay = self.delay;
        let name = self.name;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(operation = name, "Debounce timer fired");
            // Detached so a later schedule() cannot abort work already in flight.
            tokio::spawn(task);
        }));
    }

    /// Aborts the pending timer, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                if was_pending {
                    debug!(operation = self.name, "Debounce timer cancelled");
                }
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.pending).take() {
            handle.abort();
        }
    }
}
