//! In-memory storage backend
//!
//! Primary backend for tests and embedded use. Supports an optional
//! simulated byte quota and scripted write failures so quota-recovery paths
//! can be exercised deterministically.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{StorageBackend, StorageError};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    fail_next_sets: usize,
    set_attempts: usize,
}

/// Thread-safe in-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that rejects writes once total stored bytes would exceed
    /// `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                quota_bytes: Some(quota_bytes),
                ..Inner::default()
            }),
        }
    }

    /// Make the next `n` writes fail with a quota error regardless of size
    pub fn fail_next_sets(&self, n: usize) {
        self.inner.lock().expect("backend lock").fail_next_sets = n;
    }

    /// Total number of `set` calls observed (including failed ones)
    pub fn set_attempts(&self) -> usize {
        self.inner.lock().expect("backend lock").set_attempts
    }

    fn stored_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().expect("backend lock").entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("backend lock");
        inner.set_attempts += 1;

        if inner.fail_next_sets > 0 {
            inner.fail_next_sets -= 1;
            return Err(StorageError::QuotaExceeded);
        }

        if let Some(quota) = inner.quota_bytes {
            let existing = inner.entries.get(key).map_or(0, |v| key.len() + v.len());
            let prospective =
                Self::stored_bytes(&inner.entries) - existing + key.len() + value.len();
            if prospective > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.inner.lock().expect("backend lock").entries.remove(key);
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner
            .lock()
            .expect("backend lock")
            .entries
            .keys()
            .nth(index)
            .cloned()
    }

    fn len(&self) -> usize {
        self.inner.lock().expect("backend lock").entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("k"), None);
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k"), Some("v".to_string()));
        backend.remove("k");
        assert_eq!(backend.get("k"), None);
    }

    #[test]
    fn test_key_enumeration() {
        let backend = MemoryBackend::new();
        backend.set("b", "2").unwrap();
        backend.set("a", "1").unwrap();
        assert_eq!(backend.len(), 2);
        // BTreeMap keys enumerate in sorted order
        assert_eq!(backend.key(0), Some("a".to_string()));
        assert_eq!(backend.key(1), Some("b".to_string()));
        assert_eq!(backend.key(2), None);
    }

    #[test]
    fn test_quota_enforced() {
        let backend = MemoryBackend::with_quota(10);
        backend.set("k", "12345").unwrap(); // 6 bytes
        assert_eq!(
            backend.set("q", "123456789"),
            Err(StorageError::QuotaExceeded)
        );
        // Overwriting the existing key within quota is fine
        backend.set("k", "123456789").unwrap(); // 10 bytes
    }

    #[test]
    fn test_scripted_failures() {
        let backend = MemoryBackend::new();
        backend.fail_next_sets(1);
        assert_eq!(backend.set("k", "v"), Err(StorageError::QuotaExceeded));
        backend.set("k", "v").unwrap();
        assert_eq!(backend.set_attempts(), 2);
    }
}
