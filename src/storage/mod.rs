//! Versioned, time-expiring draft persistence over a pluggable key-value
//! backend
//!
//! Drafts are wrapped in a [`StoredRecord`] envelope carrying an
//! epoch-millisecond timestamp and a schema version. A record is valid only
//! if its version matches [`STORAGE_VERSION`] and it is younger than
//! [`DRAFT_EXPIRY_MS`]; anything else is deleted on sight and treated as
//! absent. Autosave failures never propagate to the editing flow.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Envelope schema version; bump when the persisted shape changes
pub const STORAGE_VERSION: &str = "1.2.0";

/// Drafts older than this are discarded (7 days)
pub const DRAFT_EXPIRY_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Namespace prefix for every key this crate writes
pub const KEY_NAMESPACE: &str = "moveform_";

/// Default logical key for the single-draft flow
pub const DEFAULT_PERSISTENCE_KEY: &str = "service_request_draft";

/// Quota assumed for usage estimates when the backend cannot report one
/// (matches common browser local-storage limits)
pub const ASSUMED_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Errors a backend write can produce
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Minimal synchronous key-value contract. Any persistent store satisfying
/// this is substitutable: browser-style local storage, files, an embedded DB.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
    /// Key at a stable enumeration index, for namespace sweeps
    fn key(&self, index: usize) -> Option<String>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Backends are often shared between an engine and its host; delegate through
// Arc so both sides can hold one.
impl<B: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<B> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Persistence envelope around the form data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    pub data: T,
    /// Epoch milliseconds at save time
    pub timestamp: i64,
    pub version: String,
}

/// Envelope metadata only, for validity sweeps that must not depend on the
/// payload shape
#[derive(Debug, Deserialize)]
struct RecordMeta {
    timestamp: i64,
    version: String,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_fresh(timestamp: i64, version: &str) -> bool {
    version == STORAGE_VERSION && now_ms().saturating_sub(timestamp) <= DRAFT_EXPIRY_MS
}

/// Storage usage estimate for diagnostic surfacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub used_bytes: usize,
    pub entry_count: usize,
    pub quota_bytes: usize,
    pub available_bytes: usize,
}

/// Draft store for one logical key, layered over a [`StorageBackend`]
pub struct FormStorage<T, B> {
    backend: B,
    key: String,
    _data: PhantomData<fn() -> T>,
}

impl<T, B> FormStorage<T, B>
where
    T: Serialize + DeserializeOwned,
    B: StorageBackend,
{
    /// Create a store for the given logical key (namespaced internally)
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            _data: PhantomData,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn full_key(&self) -> String {
        format!("{KEY_NAMESPACE}{}", self.key)
    }

    /// Whether a valid (parseable, current-version, unexpired) draft exists.
    /// Invalid entries are deleted as a side effect.
    pub fn has_saved_data(&self) -> bool {
        self.load_valid_raw().is_some()
    }

    /// Load the draft if a valid one exists; deletes and returns `None`
    /// otherwise
    pub fn load_data(&self) -> Option<T> {
        let raw = self.load_valid_raw()?;
        match serde_json::from_str::<StoredRecord<T>>(&raw) {
            Ok(record) => Some(record.data),
            Err(err) => {
                warn!("stored draft payload unreadable, discarding: {err}");
                self.backend.remove(&self.full_key());
                None
            }
        }
    }

    /// Persist the draft now. On quota exhaustion, sweeps stale entries in
    /// the namespace and retries exactly once; a still-failing retry is
    /// swallowed (autosave must never crash the caller).
    pub fn save_data(&self, data: &T) {
        let record = StoredRecord {
            data,
            timestamp: now_ms(),
            version: STORAGE_VERSION.to_string(),
        };
        let serialized = match serde_json::to_string(&record) {
            Ok(s) => s,
            Err(err) => {
                warn!("draft could not be serialized, skipping save: {err}");
                return;
            }
        };

        match self.backend.set(&self.full_key(), &serialized) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded) => {
                debug!("storage quota exceeded, sweeping stale entries");
                self.cleanup_stale();
                if let Err(err) = self.backend.set(&self.full_key(), &serialized) {
                    warn!("draft save failed after cleanup, dropping: {err}");
                }
            }
            Err(err) => {
                warn!("draft save failed, dropping: {err}");
            }
        }
    }

    /// Unconditionally delete the draft; failures are logged, never thrown
    pub fn clear_data(&self) {
        self.backend.remove(&self.full_key());
    }

    /// Delete every namespace entry that is expired, version-mismatched, or
    /// unparseable. Other keys are left alone.
    pub fn cleanup_stale(&self) {
        let mut stale = Vec::new();
        for index in 0..self.backend.len() {
            let Some(key) = self.backend.key(index) else {
                continue;
            };
            if !key.starts_with(KEY_NAMESPACE) {
                continue;
            }
            let keep = self
                .backend
                .get(&key)
                .and_then(|raw| serde_json::from_str::<RecordMeta>(&raw).ok())
                .is_some_and(|meta| is_fresh(meta.timestamp, &meta.version));
            if !keep {
                stale.push(key);
            }
        }
        for key in stale {
            debug!("removing stale draft entry {key}");
            self.backend.remove(&key);
        }
    }

    /// Bytes used across the namespace, against an assumed quota. Diagnostic
    /// only; never consulted for control flow beyond the quota sweep.
    pub fn usage(&self) -> StorageUsage {
        let mut used_bytes = 0;
        let mut entry_count = 0;
        for index in 0..self.backend.len() {
            let Some(key) = self.backend.key(index) else {
                continue;
            };
            if !key.starts_with(KEY_NAMESPACE) {
                continue;
            }
            if let Some(value) = self.backend.get(&key) {
                used_bytes += key.len() + value.len();
                entry_count += 1;
            }
        }
        StorageUsage {
            used_bytes,
            entry_count,
            quota_bytes: ASSUMED_QUOTA_BYTES,
            available_bytes: ASSUMED_QUOTA_BYTES.saturating_sub(used_bytes),
        }
    }

    /// Raw envelope string, with validity checks and the deletion side
    /// effect for invalid entries
    fn load_valid_raw(&self) -> Option<String> {
        let key = self.full_key();
        let raw = self.backend.get(&key)?;
        match serde_json::from_str::<RecordMeta>(&raw) {
            Ok(meta) if is_fresh(meta.timestamp, &meta.version) => Some(raw),
            Ok(meta) => {
                debug!(
                    "discarding draft (version {}, age {}ms)",
                    meta.version,
                    now_ms().saturating_sub(meta.timestamp)
                );
                self.backend.remove(&key);
                None
            }
            Err(err) => {
                warn!("discarding corrupt draft: {err}");
                self.backend.remove(&key);
                None
            }
        }
    }
}
