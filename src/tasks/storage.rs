// Per-device key/value storage backing the task store
use crate::error::Result;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces whatever was stored under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One JSON document per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // Write-then-rename so a crash never leaves half a list behind
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{TaskStore, STORAGE_KEY};

    #[test]
    fn test_missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert_eq!(storage.get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).unwrap();

        storage.set("tasks", "[1,2,3]").unwrap();
        storage.set("tasks", "[]").unwrap();

        assert_eq!(storage.get("tasks").unwrap().as_deref(), Some("[]"));
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_task_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = TaskStore::load(FileStorage::new(dir.path()).unwrap()).unwrap();
        let id = store.add("Pay rent", None).unwrap().unwrap().id.clone();
        store.toggle(&id).unwrap();
        drop(store);

        let reopened = TaskStore::load(FileStorage::new(dir.path()).unwrap()).unwrap();
        assert_eq!(reopened.tasks().len(), 1);
        assert!(reopened.get(&id).unwrap().completed);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tasks.json"), "{not json").unwrap();

        let result = TaskStore::load(FileStorage::new(dir.path()).unwrap());
        assert!(matches!(result, Err(crate::error::AppError::Serialization(_))));
    }
}
