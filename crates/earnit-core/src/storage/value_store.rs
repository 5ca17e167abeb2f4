use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::{
    availability::AvailabilityCache,
    backend::{BackendError, KeyValueBackend},
};

/// Where a written value ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Primary,
    Fallback,
}

/// Result of moving a legacy value out of the fallback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Copied into the primary backend and removed from the fallback.
    Migrated,
    /// The primary backend is unavailable, so the fallback copy is authoritative and stays.
    PrimaryUnavailable,
    /// The primary write failed; the fallback copy is kept so nothing is lost.
    PrimaryWriteFailed,
}

/// String store that prefers a secure backend and degrades to a plain one.
///
/// The preferred backend is probed once per [`AvailabilityCache`]. Values
/// found only in the fallback backend are migrated into the primary one the
/// first time they are read. Storage errors never escape reads or deletes;
/// they are logged and treated as "no value".
#[derive(Clone)]
pub struct SecureValueStore {
    primary: Arc<dyn KeyValueBackend>,
    fallback: Arc<dyn KeyValueBackend>,
    availability: Arc<AvailabilityCache>,
}

impl SecureValueStore {
    /// Build a store sharing the process-wide availability cache.
    pub fn new(
        primary: impl KeyValueBackend + 'static,
        fallback: impl KeyValueBackend + 'static,
    ) -> Self {
        Self::with_cache(primary, fallback, AvailabilityCache::global())
    }

    /// Build a store with its own availability cache.
    pub fn with_cache(
        primary: impl KeyValueBackend + 'static,
        fallback: impl KeyValueBackend + 'static,
        availability: Arc<AvailabilityCache>,
    ) -> Self {
        Self {
            primary: Arc::new(primary),
            fallback: Arc::new(fallback),
            availability,
        }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Whether the preferred backend is usable. Probes at most once per cache.
    pub async fn is_available(&self) -> bool {
        self.availability.check(self.primary.as_ref()).await
    }

    /// Write to the preferred backend, or to the fallback when it is
    /// unavailable or the write fails. Errors only if the fallback write fails too.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn write(&self, key: &str, value: &str) -> Result<Placement, BackendError> {
        if self.is_available().await {
            match self.primary.put(key, value).await {
                Ok(()) => return Ok(Placement::Primary),
                Err(err) => warn!(
                    backend = self.primary.name(),
                    "failed to write {key} to secure backend, falling back: {err}"
                ),
            }
        }

        self.fallback.put(key, value).await?;
        Ok(Placement::Fallback)
    }

    /// Read a value, preferring the secure backend. A value found only in the
    /// fallback is migrated before being returned. Empty values count as absent.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn read(&self, key: &str) -> Option<String> {
        if self.is_available().await {
            match self.primary.get(key).await {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(err) => warn!(
                    backend = self.primary.name(),
                    "failed to read {key} from secure backend: {err}"
                ),
            }
        }

        let legacy = match self.fallback.get(key).await {
            Ok(Some(value)) if !value.is_empty() => value,
            Ok(_) => return None,
            Err(err) => {
                warn!(
                    backend = self.fallback.name(),
                    "failed to read legacy {key}: {err}"
                );
                return None;
            }
        };

        self.migrate(key, &legacy).await;
        Some(legacy)
    }

    /// Move a legacy value into the primary backend. The primary write always
    /// happens before the fallback delete.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn migrate(&self, key: &str, value: &str) -> MigrationOutcome {
        if !self.is_available().await {
            return MigrationOutcome::PrimaryUnavailable;
        }

        if let Err(err) = self.primary.put(key, value).await {
            warn!(
                backend = self.primary.name(),
                "failed to migrate {key} into secure backend, keeping legacy copy: {err}"
            );
            return MigrationOutcome::PrimaryWriteFailed;
        }

        if let Err(err) = self.fallback.delete(key).await {
            // The primary copy wins on the next read, so a leftover is harmless.
            warn!(
                backend = self.fallback.name(),
                "migrated {key} but failed to remove legacy copy: {err}"
            );
        }
        debug!(
            from = self.fallback.name(),
            to = self.primary.name(),
            "migrated legacy value"
        );
        MigrationOutcome::Migrated
    }

    /// Delete from both backends regardless of availability. Never fails.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn delete(&self, key: &str) {
        let (primary, fallback) =
            tokio::join!(self.primary.delete(key), self.fallback.delete(key));

        match primary {
            Ok(()) => {}
            Err(BackendError::Unavailable { backend }) => {
                debug!(backend, "skipped delete of {key} on unavailable backend")
            }
            Err(err) => warn!(
                backend = self.primary.name(),
                "failed to delete {key} from secure backend: {err}"
            ),
        }
        if let Err(err) = fallback {
            warn!(
                backend = self.fallback.name(),
                "failed to delete legacy {key}: {err}"
            );
        }
    }
}
