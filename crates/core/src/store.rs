//! Durable key-value storage backing the persistence mirror.

use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;

/// Directory under the user's data dir used for stored snapshots.
pub const DEFAULT_STORE_DIR: &str = "tally/store";

/// String key-value storage with whole-value overwrite semantics.
pub trait KeyValueStore {
    /// Fetch the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`, returning whether a value existed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

/// Store that keeps one `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers never observe a partially written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STORE_DIR)
    }

    /// Directory holding the key files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).map_err(write_err)?;

        let mut temp = NamedTempFile::new_in(&self.root).map_err(write_err)?;
        temp.write_all(value.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&path).map_err(|err| write_err(err.error))?;
        debug!(key, path = %path.display(), bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Write { path, source }),
        }
    }
}

/// In-memory store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.write().remove(key).is_some())
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("players")?, None);
        store.set("players", r#"[{"id":1,"name":"A"}]"#)?;
        assert!(dir.path().join("nested/players.json").exists());
        assert_eq!(
            store.get("players")?.as_deref(),
            Some(r#"[{"id":1,"name":"A"}]"#)
        );

        store.set("players", "[]")?;
        assert_eq!(store.get("players")?.as_deref(), Some("[]"));

        assert!(store.remove("players")?);
        assert!(!store.remove("players")?);
        assert_eq!(store.get("players")?, None);
        Ok(())
    }

    #[test]
    fn file_store_leaves_no_temp_files() -> Result<()> {
        let dir = tempdir()?;
        let store = FileStore::new(dir.path());
        store.set("columnNames", r#"["Column 1"]"#)?;
        store.set("tableData", r#"[[""]]"#)?;

        let mut names: Vec<String> = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["columnNames.json", "tableData.json"]);
        Ok(())
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = FileStore::new("unused");
        assert!(matches!(
            store.get("../escape"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.set("", "x"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn memory_store_clones_share_state() -> Result<()> {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.set("scores", "{}")?;
        assert_eq!(handle.get("scores")?.as_deref(), Some("{}"));
        assert_eq!(handle.len(), 1);
        assert!(handle.remove("scores")?);
        assert!(store.is_empty());
        Ok(())
    }
}
