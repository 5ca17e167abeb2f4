use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by key/value backends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend is not usable on this platform or in this process.
    #[error("backend unavailable: {backend}")]
    Unavailable { backend: &'static str },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

impl BackendError {
    pub fn storage<E: ToString>(err: E) -> Self {
        BackendError::Storage {
            reason: err.to_string(),
        }
    }
}

/// Contract for a physical home of small string values (OS keychain, plain files, memory).
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Short name used for logging.
    fn name(&self) -> &'static str;

    /// Check whether the backend can be used at all. Callers cache the answer.
    async fn probe(&self) -> Result<bool, BackendError>;

    /// Persist a value under a key, overwriting any existing entry.
    async fn put(&self, key: &str, value: &str) -> Result<(), BackendError>;

    /// Retrieve the value for a key, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Remove a key and its value (idempotent).
    async fn delete(&self, key: &str) -> Result<(), BackendError>;
}

/// Operation counters recorded by [`MemoryBackend`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub probes: usize,
    pub reads: usize,
    pub writes: usize,
    pub deletes: usize,
}

/// In-memory backend for tests and smoke runs. Clones share the same map,
/// counters and failure switches.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    probes: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose probe reports `false` and whose operations all fail.
    pub fn unavailable() -> Self {
        let backend = Self::default();
        backend.set_unavailable(true);
        backend
    }

    pub fn set_unavailable(&self, value: bool) {
        self.inner.unavailable.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, value: bool) {
        self.inner.fail_reads.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, value: bool) {
        self.inner.fail_writes.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, value: bool) {
        self.inner.fail_deletes.store(value, Ordering::SeqCst);
    }

    /// Insert a value directly, bypassing counters and failure switches.
    pub fn seed(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.inner.entries.lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    /// Look at a value directly, bypassing counters and failure switches.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner
            .entries
            .lock()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            probes: self.inner.probes.load(Ordering::SeqCst),
            reads: self.inner.reads.load(Ordering::SeqCst),
            writes: self.inner.writes.load(Ordering::SeqCst),
            deletes: self.inner.deletes.load(Ordering::SeqCst),
        }
    }

    fn check(&self, failing: &AtomicBool, op: &str) -> Result<(), BackendError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable { backend: "memory" });
        }
        if failing.load(Ordering::SeqCst) {
            return Err(BackendError::Storage {
                reason: format!("injected {op} failure"),
            });
        }
        Ok(())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, BackendError> {
        self.inner.entries.lock().map_err(|err| BackendError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn probe(&self) -> Result<bool, BackendError> {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
        Ok(!self.inner.unavailable.load(Ordering::SeqCst))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.check(&self.inner.fail_writes, "write")?;
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        self.check(&self.inner.fail_reads, "read")?;
        Ok(self.entries()?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.inner.deletes.fetch_add(1, Ordering::SeqCst);
        self.check(&self.inner.fail_deletes, "delete")?;
        self.entries()?.remove(key);
        Ok(())
    }
}
