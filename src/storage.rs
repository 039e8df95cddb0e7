use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use log::{debug, error, info, trace, warn};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{LuminaError, Result};

/// Storage key holding the notes collection
pub const NOTES_KEY: &str = "lumina_notes";
/// Storage key holding the files collection
pub const FILES_KEY: &str = "lumina_files";

/// A string-to-string store, the persistence primitive under the workspace.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites the value for `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

fn check_quota(quota: Option<usize>, key: &str, value: &str) -> Result<()> {
    match quota {
        Some(quota) if value.len() > quota => Err(LuminaError::QuotaExceeded {
            key: key.to_string(),
            needed: value.len(),
            quota,
        }),
        _ => Ok(()),
    }
}

/// Keeps each key in its own JSON file inside a directory.
pub struct FileStore {
    dir: PathBuf,
    quota: Option<usize>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("Store directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create store directory: {}", e);
                LuminaError::DirectoryError { path: dir.clone() }
            })?;
        }
        info!("Opened file store at {}", dir.display());
        Ok(FileStore { dir, quota: None })
    }

    /// Limits the size of any single stored value
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        trace!("Reading {}", path.display());
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(self.quota, key, value)?;

        let path = self.key_path(key);
        // Write next to the target so the final rename stays on one filesystem
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            LuminaError::Io(e)
        })?;
        temp_file.write_all(value.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            LuminaError::Io(e.error)
        })?;

        trace!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-process store, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        MemoryStore {
            values: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values.lock().map_err(|_| LuminaError::ApplicationError {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(self.quota, key, value)?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Serializes whole record collections into a [`KeyValueStore`].
pub struct PersistentStore {
    backend: Box<dyn KeyValueStore>,
}

impl PersistentStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        PersistentStore {
            backend: Box::new(backend),
        }
    }

    /// Loads the collection under `key`.
    ///
    /// Missing, unreadable or malformed data yields an empty collection.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored value for {}, starting empty", key);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read {}: {}, starting empty", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(records) => {
                debug!("Loaded {} records from {}", records.len(), key);
                records
            }
            Err(e) => {
                warn!("Stored value for {} is malformed: {}, starting empty", key, e);
                Vec::new()
            }
        }
    }

    /// Serializes the full collection and overwrites the value under `key`
    pub fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.backend.set(key, &json)?;
        debug!("Saved {} records to {}", records.len(), key);
        Ok(())
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileItem, Note};

    fn sample_notes() -> Vec<Note> {
        let mut first = Note::new();
        first.title = "Q3 Plan".into();
        first.ai_summary = Some("Budget draft for Q3.".into());
        first.is_favorite = true;

        let second = Note::new();
        vec![first, second]
    }

    #[test]
    fn round_trip_preserves_records() {
        let store = PersistentStore::new(MemoryStore::new());

        for notes in [Vec::new(), sample_notes()[..1].to_vec(), sample_notes()] {
            store.save(NOTES_KEY, &notes).unwrap();
            assert_eq!(store.load::<Note>(NOTES_KEY), notes);
        }

        let files = vec![FileItem::from_bytes(b"hello", "a.txt", "text/plain").unwrap()];
        store.save(FILES_KEY, &files).unwrap();
        assert_eq!(store.load::<FileItem>(FILES_KEY), files);
    }

    #[test]
    fn missing_or_malformed_data_loads_empty() {
        let backend = MemoryStore::new();
        backend.set(NOTES_KEY, "{not json").unwrap();
        backend.set(FILES_KEY, r#"{"id":"object, not array"}"#).unwrap();
        let store = PersistentStore::new(backend);

        assert!(store.load::<Note>(NOTES_KEY).is_empty());
        assert!(store.load::<FileItem>(FILES_KEY).is_empty());
        assert!(store.load::<Note>("never_written").is_empty());
    }

    #[test]
    fn save_overwrites_previous_value() {
        let store = PersistentStore::new(MemoryStore::new());
        store.save(NOTES_KEY, &sample_notes()).unwrap();
        store.save::<Note>(NOTES_KEY, &[]).unwrap();
        assert!(store.load::<Note>(NOTES_KEY).is_empty());
    }

    #[test]
    fn quota_rejects_oversized_values() {
        let store = PersistentStore::new(MemoryStore::with_quota(16));
        let err = store.save(NOTES_KEY, &sample_notes()).unwrap_err();
        assert!(matches!(err, LuminaError::QuotaExceeded { quota: 16, .. }));
        assert!(store.backend().get(NOTES_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let notes = sample_notes();

        {
            let store = PersistentStore::new(FileStore::open(dir.path()).unwrap());
            store.save(NOTES_KEY, &notes).unwrap();
        }

        let reopened = PersistentStore::new(FileStore::open(dir.path()).unwrap());
        assert_eq!(reopened.load::<Note>(NOTES_KEY), notes);
        assert!(dir.path().join("lumina_notes.json").exists());
    }

    #[test]
    fn file_store_creates_missing_directory_and_removes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
