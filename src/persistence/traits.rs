use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::models::PropertyDraft;
use crate::wizard::WizardStep;

/// Whole-record snapshot written on every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDraft {
    pub draft: PropertyDraft,
    pub current_step: WizardStep,
    pub saved_at: DateTime<Utc>,
}

/// Durable local key/value storage for draft records.
///
/// Operations are synchronous so that deleting a record takes effect before
/// the caller continues.
pub trait DraftStorage: Send + Sync {
    /// Reads the record under `key`, `None` if nothing is stored.
    fn load(&self, key: &str) -> Result<Option<PersistedDraft>, PersistenceError>;

    /// Overwrites the record under `key`.
    fn save(&self, key: &str, record: &PersistedDraft) -> Result<(), PersistenceError>;

    /// Deletes the record under `key`; deleting a missing record succeeds.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;

    /// Name of the backend, for logs.
    fn backend_name(&self) -> &'static str;
}
