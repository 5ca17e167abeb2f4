use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::warn;

use super::backend::KeyValueBackend;

static GLOBAL: OnceLock<Arc<AvailabilityCache>> = OnceLock::new();

/// Memoized answer to "can the preferred backend be used?".
///
/// The state is tri-state: unknown until the first [`AvailabilityCache::check`],
/// then `true` or `false` for the lifetime of the cache. A probe error is
/// cached as `false`. Concurrent first callers wait for a single probe.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    state: Mutex<Option<bool>>,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by every store built with
    /// [`SecureValueStore::new`](super::SecureValueStore::new).
    pub fn global() -> Arc<AvailabilityCache> {
        GLOBAL
            .get_or_init(|| Arc::new(AvailabilityCache::new()))
            .clone()
    }

    /// Return the cached answer, probing `backend` only if nothing is cached yet.
    pub async fn check(&self, backend: &dyn KeyValueBackend) -> bool {
        let mut state = self.state.lock().await;
        if let Some(known) = *state {
            return known;
        }

        let available = match backend.probe().await {
            Ok(true) => true,
            Ok(false) => {
                warn!(
                    backend = backend.name(),
                    "secure backend unavailable, using fallback storage"
                );
                false
            }
            Err(err) => {
                warn!(
                    backend = backend.name(),
                    "secure backend availability check failed, falling back: {err}"
                );
                false
            }
        };
        *state = Some(available);
        available
    }

    /// Cached answer without probing.
    pub async fn cached(&self) -> Option<bool> {
        *self.state.lock().await
    }

    /// Forget the cached answer so the next check probes again. Test seam only;
    /// production code never resets.
    pub async fn reset(&self) {
        *self.state.lock().await = None;
    }
}
