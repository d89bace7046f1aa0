//! Key-value persistence backends.
//!
//! The dashboard persists two string values: the tracked domain list (as a
//! JSON array) under [`DOMAINS_KEY`] and the cached workflow timestamp under
//! [`WORKFLOW_UPDATE_KEY`]. Any backend implementing [`StateStore`] can hold
//! them.

use crate::error::DomainWatchError;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Key holding the JSON array of tracked domains.
pub const DOMAINS_KEY: &str = "domains";

/// Key holding the human-readable timestamp of the last workflow report.
pub const WORKFLOW_UPDATE_KEY: &str = "lastWorkflowUpdate";

/// Synchronous string key-value storage.
///
/// Writes must be durable when `set`/`remove` return, so that a restart
/// right after a mutation observes it.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DomainWatchError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DomainWatchError>;
    fn remove(&self, key: &str) -> Result<(), DomainWatchError>;
}

/// State kept in a single JSON object file.
///
/// The whole object is rewritten on every mutation through a temporary file
/// and a rename, so readers never see a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or lazily create) the state file at `path`.
    ///
    /// A missing file is an empty state. A file that is not a JSON object of
    /// strings is logged and treated as empty; it is replaced on the next write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DomainWatchError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                DomainWatchError::storage(
                    path.to_string_lossy(),
                    format!("Failed to read state file: {}", e),
                )
            })?;

            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable state file");
                    BTreeMap::new()
                }
            }
        } else {
            debug!(path = %path.display(), "state file does not exist yet");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), DomainWatchError> {
        let to_storage_error = |e: std::io::Error| {
            DomainWatchError::storage(self.path.to_string_lossy(), e.to_string())
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(to_storage_error)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, content).map_err(to_storage_error)?;
        fs::rename(&tmp_path, &self.path).map_err(to_storage_error)?;
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainWatchError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainWatchError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.flush(&entries) {
            // Keep memory in line with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainWatchError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

/// In-memory state for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainWatchError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainWatchError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainWatchError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(DOMAINS_KEY).unwrap(), None);
        store.set(DOMAINS_KEY, r#"["a.com","b.org"]"#).unwrap();
        store.set(WORKFLOW_UPDATE_KEY, "2024-01-01 10:00:00").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(DOMAINS_KEY).unwrap().as_deref(),
            Some(r#"["a.com","b.org"]"#)
        );
        assert_eq!(
            reopened.get(WORKFLOW_UPDATE_KEY).unwrap().as_deref(),
            Some("2024-01-01 10:00:00")
        );

        reopened.remove(WORKFLOW_UPDATE_KEY).unwrap();
        let again = JsonFileStore::open(&path).unwrap();
        assert_eq!(again.get(WORKFLOW_UPDATE_KEY).unwrap(), None);
    }

    #[test]
    fn test_file_store_tolerates_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "this is not json").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(DOMAINS_KEY).unwrap(), None);

        store.set(DOMAINS_KEY, "[]").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("domains"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
