//! JSON-file-backed [`KeyValueStore`].
//!
//! The whole store is one JSON object of string values, rewritten atomically
//! on every mutation so the file is never left half-written.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use atomicwrites::{AllowOverwrite, AtomicFile};

use super::KeyValueStore;
use crate::error::PikPakError;

/// Directory name under the user data dir
pub const APP_DIR_NAME: &str = "pikpak-plus";
/// File name of the default store
pub const STORE_FILE_NAME: &str = "local-storage.json";

/// Persistent store kept in a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file starts an empty store. A file that cannot be parsed is
    /// logged and treated as empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PikPakError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable store {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens the store in the user data directory
    /// (e.g. `~/.local/share/pikpak-plus/local-storage.json`).
    pub fn open_default() -> Result<Self, PikPakError> {
        Self::open(Self::default_path()?)
    }

    /// Location used by [`FileStore::open_default`]
    pub fn default_path() -> Result<PathBuf, PikPakError> {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join(STORE_FILE_NAME))
            .ok_or_else(|| PikPakError::Storage("No user data directory available".into()))
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), PikPakError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| PikPakError::Serde(e.to_string()))?;
        AtomicFile::new(&self.path, AllowOverwrite).write(|f| f.write_all(&json))?;
        Ok(())
    }

    fn mutate(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), PikPakError> {
        let mut entries = self.lock();
        let mut next = entries.clone();
        if f(&mut next) {
            // memory only changes once the file does
            self.persist(&next)?;
            *entries = next;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PikPakError> {
        self.mutate(|m| m.insert(key.to_string(), value.to_string()).as_deref() != Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), PikPakError> {
        self.mutate(|m| m.remove(key).is_some())
    }

    fn clear(&self) -> Result<(), PikPakError> {
        self.mutate(|m| {
            m.clear();
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_opens_empty() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("store.json")).unwrap();
        assert_eq!(store.get("email"), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("selectedServer", "3").unwrap();
        store.set("email", "me@example.com").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("selectedServer").as_deref(), Some("3"));
        assert_eq!(reopened.get("email").as_deref(), Some("me@example.com"));
    }

    #[test]
    fn remove_and_clear_are_persisted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();
        assert_eq!(FileStore::open(&path).unwrap().get("a"), None);

        store.clear().unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("b"), None);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("state");
        let path = dir.join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("selectedServer", "1").unwrap();

        // parent directory replaced by a regular file
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();

        assert!(matches!(
            store.set("selectedServer", "9"),
            Err(PikPakError::Storage(_))
        ));
        assert_eq!(store.get("selectedServer").as_deref(), Some("1"));

        assert!(store.set("email", "me@example.com").is_err());
        assert_eq!(store.get("email"), None);

        assert!(store.remove("selectedServer").is_err());
        assert!(store.clear().is_err());
        assert_eq!(store.get("selectedServer").as_deref(), Some("1"));
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("anything"), None);

        store.set("darkMode", "true").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"darkMode\""));
    }
}
