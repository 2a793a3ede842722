//! Local key-value storage for client state.
//!
//! Holds the persisted user id and the shadow cart. The file backend keeps
//! every key in one JSON object and replaces the file atomically on write.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("state file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage backed by a single JSON file.
///
/// A missing file reads as empty. Writes go to a temporary file in the same
/// directory which then replaces the original, so a crash mid-write never
/// leaves a truncated state file behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_error = |source: io::Error| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_error)?;

        let bytes = serde_json::to_vec_pretty(entries).map_err(|e| write_error(e.into()))?;
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
        temp.write_all(&bytes).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    /// Read-modify-write under the in-process lock.
    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking every later write.
        let mut entries = match self.read_all() {
            Err(StorageError::Corrupt { .. }) => BTreeMap::new(),
            other => other?,
        };
        change(&mut entries);
        self.write_all(&entries)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::default();
        assert_eq!(storage.get("userId").unwrap(), None);

        storage.set("userId", "user_1").unwrap();
        assert_eq!(storage.get("userId").unwrap().as_deref(), Some("user_1"));

        storage.set("userId", "user_2").unwrap();
        assert_eq!(storage.get("userId").unwrap().as_deref(), Some("user_2"));
        assert_eq!(storage.get("cart").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("cart").unwrap(), None);
        storage.set("cart", "{\"items\":[]}").unwrap();
        storage.set("userId", "user_1").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("cart").unwrap().as_deref(),
            Some("{\"items\":[]}")
        );
        assert_eq!(reopened.get("userId").unwrap().as_deref(), Some("user_1"));

        // Writing one key keeps the others.
        reopened.set("cart", "{}").unwrap();
        assert_eq!(storage.get("cart").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.get("userId").unwrap().as_deref(), Some("user_1"));
    }

    #[test]
    fn test_corrupt_file_is_reported_then_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("cart"),
            Err(StorageError::Corrupt { .. })
        ));

        storage.set("userId", "user_1").unwrap();
        assert_eq!(storage.get("userId").unwrap().as_deref(), Some("user_1"));
    }
}
