//! Defensive key-value storage for researcher preferences and drafts
//!
//! Storage can be missing or broken (no writable home directory, corrupt file, full
//! disk). [`SafeStorage`] turns every such failure into a logged warning and a default.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage is not available")]
    Unavailable,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Raw string storage, the shape of browser `localStorage`
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// All entries kept in one JSON object file
pub struct FileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Storage that does not exist, as when rendering without a browser
pub struct UnavailableBackend;

impl KeyValueBackend for UnavailableBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// JSON values over a backend; never fails, only degrades
pub struct SafeStorage {
    backend: Box<dyn KeyValueBackend>,
}

impl SafeStorage {
    pub fn new(backend: impl KeyValueBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Stored value for `key`, or `default` when absent or unreadable
    pub fn safe_get_item<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read from storage");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Stored value could not be decoded");
                default
            }
        }
    }

    pub fn safe_set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Value could not be encoded for storage");
                return false;
            }
        };

        match self.backend.set(key, &encoded) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to write to storage");
                false
            }
        }
    }

    pub fn safe_remove_item(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to remove from storage");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentMetadata;

    #[test]
    fn test_memory_round_trip_structured_value() {
        let storage = SafeStorage::in_memory();
        let metadata = DocumentMetadata {
            title: Some("Letter to Mrs. Adams".to_string()),
            tags: vec!["revolution".to_string()],
            ..Default::default()
        };

        assert!(storage.safe_set_item("metadata", &metadata));
        let loaded: DocumentMetadata = storage.safe_get_item("metadata", DocumentMetadata::default());

        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_missing_key_returns_default() {
        let storage = SafeStorage::in_memory();

        assert_eq!(storage.safe_get_item("model", "claude".to_string()), "claude");
    }

    #[test]
    fn test_unavailable_backend_degrades() {
        let storage = SafeStorage::new(UnavailableBackend);

        assert!(!storage.safe_set_item("model", "gpt"));
        assert_eq!(storage.safe_get_item("model", "claude".to_string()), "claude");
        assert!(!storage.safe_remove_item("model"));
    }

    #[test]
    fn test_undecodable_value_returns_default() {
        let backend = MemoryBackend::new();
        backend.set("count", "not a number").unwrap();
        let storage = SafeStorage::new(backend);

        assert_eq!(storage.safe_get_item("count", 7u32), 7);
    }

    #[test]
    fn test_remove_deletes_value() {
        let storage = SafeStorage::in_memory();
        storage.safe_set_item("perspective", "economist");

        assert!(storage.safe_remove_item("perspective"));
        assert_eq!(storage.safe_get_item("perspective", String::new()), "");
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = SafeStorage::new(FileBackend::new(&path));
        assert!(storage.safe_set_item("drafts", &vec!["a", "b"]));
        assert!(storage.safe_set_item("model", "gpt"));

        let reopened = SafeStorage::new(FileBackend::new(&path));
        let drafts: Vec<String> = reopened.safe_get_item("drafts", Vec::new());
        assert_eq!(drafts, vec!["a", "b"]);
        assert!(reopened.safe_remove_item("drafts"));
        assert!(reopened.safe_get_item::<Vec<String>>("drafts", Vec::new()).is_empty());
        assert_eq!(reopened.safe_get_item("model", String::new()), "gpt");
    }

    #[test]
    fn test_corrupt_file_degrades_to_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "{ definitely not json").unwrap();
        let storage = SafeStorage::new(FileBackend::new(file.path()));

        assert_eq!(storage.safe_get_item("model", "claude".to_string()), "claude");
        assert!(!storage.safe_set_item("model", "gpt"));
    }
}
