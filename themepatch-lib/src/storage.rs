//! Durable key/value stores for persisted CSS.

use crate::error::StorageError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Where persisted CSS lives between sessions.
pub trait StyleStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStorage { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys map to file names; characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::EmptyKey);
        }
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.root.join(name))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StyleStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.root).map_err(|e| io_error(&self.root, e))?;

        // Write beside the target and rename, so readers never see half a sheet.
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        std::fs::write(&tmp, value).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

/// In-process store with an optional byte quota across all keys.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        MemoryStorage {
            entries: HashMap::new(),
            quota: Some(limit),
        }
    }
}

impl StyleStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::EmptyKey);
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::EmptyKey);
        }
        if let Some(limit) = self.quota {
            let others: usize = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.get("customCSS").unwrap(), None);

        storage.set("customCSS", ".a { color: red; }").unwrap();
        storage.set("customCSS", ".b { color: blue; }").unwrap();
        assert_eq!(
            storage.get("customCSS").unwrap().as_deref(),
            Some(".b { color: blue; }")
        );

        storage.remove("customCSS").unwrap();
        storage.remove("customCSS").unwrap();
        assert_eq!(storage.get("customCSS").unwrap(), None);
    }

    #[test]
    fn file_storage_sanitizes_keys() {
        let storage = FileStorage::new("/tmp/themes");
        let path = storage.path_for("vendor_portal:dynamic theme/css").unwrap();
        assert_eq!(path, Path::new("/tmp/themes/vendor_portal_dynamic_theme_css"));
        assert!(matches!(storage.path_for("  "), Err(StorageError::EmptyKey)));
    }

    #[test]
    fn memory_quota_is_enforced() {
        let mut storage = MemoryStorage::with_quota(16);
        storage.set("k", "0123456789").unwrap();
        // Replacing a key only counts the new value.
        storage.set("k", "abcdefghij").unwrap();
        let err = storage.set("k2", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("abcdefghij"));
    }
}
