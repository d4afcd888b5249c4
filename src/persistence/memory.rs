use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::PersistenceError;
use crate::persistence::traits::{DraftStorage, PersistedDraft};
use crate::scheduler::lock;

/// Process-local storage that keeps records as serialized JSON, with an
/// optional per-record size quota.
#[derive(Debug, Default)]
pub struct MemoryDraftStorage {
    records: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryDraftStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            records: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.records).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStorage for MemoryDraftStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedDraft>, PersistenceError> {
        let records = lock(&self.records);
        let Some(raw) = records.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|source| PersistenceError::Serialize {
                key: key.to_string(),
                source,
            })
    }

    fn save(&self, key: &str, record: &PersistedDraft) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(record).map_err(|source| PersistenceError::Serialize {
            key: key.to_string(),
            source,
        })?;

        if self.quota_bytes.is_some_and(|quota| json.len() > quota) {
            return Err(PersistenceError::QuotaExceeded {
                key: key.to_string(),
            });
        }

        lock(&self.records).insert(key.to_string(), json);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        lock(&self.records).remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
