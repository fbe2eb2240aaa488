//! File-backed storage backend: one file per key under a directory
//!
//! The local-draft store for desktop/CLI hosts. Keys map directly to file
//! names (namespaced keys only contain path-safe characters).

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use super::{StorageBackend, StorageError};

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Sorted key listing for stable enumeration
    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        keys.sort();
        keys
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value).map_err(|e| {
            if e.kind() == ErrorKind::StorageFull {
                StorageError::QuotaExceeded
            } else {
                StorageError::Backend(e.to_string())
            }
        })
    }

    fn remove(&self, key: &str) {
        if let Err(e) = fs::remove_file(self.path_for(key)) {
            if e.kind() != ErrorKind::NotFound {
                warn!("failed to remove draft file {key}: {e}");
            }
        }
    }

    fn key(&self, index: usize) -> Option<String> {
        self.keys().into_iter().nth(index)
    }

    fn len(&self) -> usize {
        self.keys().len()
    }
}
