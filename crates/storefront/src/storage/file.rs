use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{StorageError, StorageSlot};

/// Directory-backed storage: each key lives in `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl StorageSlot for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(io_error(key))?;

        // Unique per write, so concurrent writers never share a temp file.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_error(key))?;
        tmp.write_all(value.as_bytes()).map_err(io_error(key))?;
        tmp.as_file().sync_all().map_err(io_error(key))?;
        tmp.persist(&path)
            .map(drop)
            .map_err(|e| io_error(key)(e.error))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.get("optic_favorites").unwrap(), None);
        storage.remove("optic_favorites").unwrap();
    }

    #[test]
    fn test_set_creates_dir_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        storage.set("optic_favorites", "[1,2]").unwrap();
        storage.set("optic_favorites", "[3]").unwrap();

        assert_eq!(storage.get("optic_favorites").unwrap().as_deref(), Some("[3]"));
        assert!(dir.path().join("nested/optic_favorites.json").exists());
        let entries = fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1, "no temp files left behind");
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::new(dir.path()).set("optic_cart", "[]").unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get("optic_cart").unwrap().as_deref(), Some("[]"));

        reopened.remove("optic_cart").unwrap();
        assert_eq!(reopened.get("optic_cart").unwrap(), None);
    }

    #[test]
    fn test_concurrent_writers_never_fail() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));

        let writers: Vec<_> = ["[1]", "[2]"]
            .into_iter()
            .map(|value| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    (0..200)
                        .filter(|_| storage.set("optic_cart", value).is_err())
                        .count()
                })
            })
            .collect();

        let failed: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failed, 0);

        let stored = storage.get("optic_cart").unwrap();
        assert!(matches!(stored.as_deref(), Some("[1]" | "[2]")));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        for key in ["", "../escape", "a/b", "with space"] {
            assert!(matches!(
                storage.set(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }
}
