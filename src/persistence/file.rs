use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PersistenceError;
use crate::persistence::traits::{DraftStorage, PersistedDraft};

/// Stores each record as a JSON file named after its key.
///
/// Uses blocking `std::fs`: [`DraftStorage`] is synchronous so that a delete
/// has completed when `delete_draft` returns, and records are a few KB.
#[derive(Debug, Clone)]
pub struct FileDraftStorage {
    dir: PathBuf,
}

impl FileDraftStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }

    fn io_error(key: &str, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl DraftStorage for FileDraftStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedDraft>, PersistenceError> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(key, e)),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistenceError::Serialize {
                key: key.to_string(),
                source,
            })
    }

    fn save(&self, key: &str, record: &PersistedDraft) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(record).map_err(|source| {
            PersistenceError::Serialize {
                key: key.to_string(),
                source,
            }
        })?;

        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        // Write then rename so a crash mid-write never leaves a truncated record.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Self::io_error(key, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Self::io_error(key, e))?;

        debug!(path = %path.display(), "Draft written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
