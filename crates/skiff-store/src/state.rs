use skiff_types::SkiffError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Trait for the raw key/value persistence layer.
///
/// Values are JSON strings. A read that fails (missing file, I/O error)
/// reports absence rather than an error; the typed stores above this treat
/// unparseable values the same way.
pub trait StateStore: Send + Sync {
    /// Read the stored value for a key, `None` when absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    /// Overwrite the stored value for a key.
    fn write(&self, key: &str, value: &str) -> Result<(), SkiffError>;

    /// Remove a key. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory state store (for testing and ephemeral sessions).
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SkiffError> {
        self.values
            .write()
            .map_err(|_| SkiffError::Storage("state lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.write() {
            values.remove(key);
        }
    }
}

/// File-backed state store: one JSON file per key under a directory.
///
/// Writes are synchronous whole-file overwrites, mirroring the browser
/// storage semantics this replaces.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SkiffError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SkiffError::Storage(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "state read treated as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SkiffError> {
        std::fs::write(self.path_for(key), value).map_err(|e| SkiffError::Storage(e.to_string()))
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.read("k"), None);
        store.write("k", "v").unwrap();
        assert_eq!(store.read("k"), Some("v".to_string()));
        store.remove("k");
        assert_eq!(store.read("k"), None);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("storacha_session", "{\"a\":1}").unwrap();
        assert_eq!(store.read("storacha_session"), Some("{\"a\":1}".to_string()));
        store.remove("storacha_session");
        assert_eq!(store.read("storacha_session"), None);
    }

    #[test]
    fn file_store_missing_key_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.read("never_written"), None);
    }

    #[test]
    fn file_store_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("k", "first").unwrap();
        store.write("k", "second").unwrap();
        assert_eq!(store.read("k"), Some("second".to_string()));
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.remove("nothing");
    }
}
