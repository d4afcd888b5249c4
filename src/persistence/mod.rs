//! Debounced autosave and restore of the draft to durable local storage.

pub mod file;
pub mod memory;
pub mod traits;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::scheduler::{lock, Debouncer};
use crate::store::{DraftChange, DraftHandle, DraftListener};

pub use file::FileDraftStorage;
pub use memory::MemoryDraftStorage;
pub use traits::{DraftStorage, PersistedDraft};

struct PersistenceState {
    storage: Arc<dyn DraftStorage>,
    key: String,
    /// Bumped by every delete; held for the duration of each write.
    epoch: Mutex<u64>,
    last_error: Mutex<Option<String>>,
    last_saved_at: Mutex<Option<DateTime<Utc>>>,
}

impl PersistenceState {
    /// Writes the store's current contents. With `expected_epoch` set, the
    /// write is skipped if a delete happened since it was scheduled.
    fn write(
        &self,
        expected_epoch: Option<u64>,
        handle: &DraftHandle,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let epoch = lock(&self.epoch);
        if expected_epoch.is_some_and(|expected| expected != *epoch) {
            debug!(key = %self.key, "Skipping save scheduled before draft deletion");
            return Ok(None);
        }

        let record = handle.read(|store| PersistedDraft {
            draft: store.draft().clone(),
            current_step: store.current_step(),
            saved_at: Utc::now(),
        });
        self.storage.save(&self.key, &record)?;
        Ok(Some(record.saved_at))
    }

    fn record_outcome(&self, outcome: &Result<Option<DateTime<Utc>>, PersistenceError>) {
        match outcome {
            Ok(Some(saved_at)) => {
                *lock(&self.last_saved_at) = Some(*saved_at);
                *lock(&self.last_error) = None;
                debug!(key = %self.key, backend = self.storage.backend_name(), "Draft saved");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to save draft; will retry on next edit");
                *lock(&self.last_error) = Some(e.to_string());
            }
        }
    }
}

/// Keeps the persisted record in step with the draft store.
pub struct PersistenceManager {
    state: Arc<PersistenceState>,
    debouncer: Debouncer,
}

impl PersistenceManager {
    pub fn new(storage: Arc<dyn DraftStorage>, key: impl Into<String>, delay: Duration) -> Self {
        Self {
            state: Arc::new(PersistenceState {
                storage,
                key: key.into(),
                epoch: Mutex::new(0),
                last_error: Mutex::new(None),
                last_saved_at: Mutex::new(None),
            }),
            debouncer: Debouncer::new("autosave", delay),
        }
    }

    pub fn key(&self) -> &str {
        &self.state.key
    }

    /// Loads the persisted record, treating read failures as "nothing saved".
    pub fn restore(&self) -> Option<PersistedDraft> {
        match self.state.storage.load(&self.state.key) {
            Ok(Some(record)) => {
                info!(
                    key = %self.state.key,
                    step = ?record.current_step,
                    saved_at = %record.saved_at,
                    "Restored saved draft"
                );
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    key = %self.state.key,
                    error = %e,
                    "Could not read saved draft; starting fresh"
                );
                *lock(&self.state.last_error) = Some(e.to_string());
                None
            }
        }
    }

    /// (Re)starts the autosave timer. The store is read when the timer fires.
    pub fn schedule_save(&self, handle: &DraftHandle) {
        let state = Arc::clone(&self.state);
        let handle = handle.clone();
        let epoch = *lock(&self.state.epoch);
        self.debouncer.schedule(async move {
            let outcome = state.write(Some(epoch), &handle);
            state.record_outcome(&outcome);
        });
    }

    /// Cancels any pending autosave and writes immediately.
    ///
    /// # Errors
    ///
    /// Returns the storage error; it is also recorded in [`Self::last_error`].
    pub fn flush(&self, handle: &DraftHandle) -> Result<DateTime<Utc>, PersistenceError> {
        self.debouncer.cancel();
        let outcome = self.state.write(None, handle);
        self.state.record_outcome(&outcome);
        outcome.map(|saved_at| saved_at.unwrap_or_else(Utc::now))
    }

    /// Clears the persisted record and resets the store, immediately.
    pub fn delete_draft(&self, handle: &DraftHandle) {
        self.debouncer.cancel();
        {
            let mut epoch = lock(&self.state.epoch);
            *epoch += 1;
            if let Err(e) = self.state.storage.remove(&self.state.key) {
                warn!(key = %self.state.key, error = %e, "Failed to remove saved draft");
                *lock(&self.state.last_error) = Some(e.to_string());
            }
        }
        *lock(&self.state.last_saved_at) = None;
        handle.reset();
        info!(key = %self.state.key, "Draft deleted");
    }

    pub fn cancel_pending(&self) -> bool {
        self.debouncer.cancel()
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.state.last_error).clone()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.state.last_saved_at)
    }
}

impl DraftListener for PersistenceManager {
    fn on_draft_change(&self, handle: &DraftHandle, change: DraftChange<'_>) {
        match change {
            DraftChange::Fields(_) | DraftChange::Step(_) => self.schedule_save(handle),
            DraftChange::Reset => {}
        }
    }
}
