use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use earnit_core::storage::SecureValueStore;
use earnit_storage::{keyring_backend::KeyringBackend, plain_file_backend::PlainFileBackend};
use tracing::debug;

pub const DEFAULT_KEYRING_SERVICE: &str = "earnit";

/// Resolve the default data directory for EarnIt.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("earnit"))
}

/// Build the keychain-first value store, honouring config overrides.
pub fn store_from_config(config: &Config) -> Result<SecureValueStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    }
    .join("values");
    let service = config
        .keyring_service
        .clone()
        .unwrap_or_else(|| DEFAULT_KEYRING_SERVICE.to_string());

    debug!(?root, %service, "initializing value store");
    Ok(SecureValueStore::new(
        KeyringBackend::new(service),
        PlainFileBackend::new(root),
    ))
}

/// Helper for tests: in-memory primary over a plain fallback rooted at a temp dir,
/// with its own availability cache.
#[cfg(test)]
pub fn test_store(root: impl Into<PathBuf>) -> SecureValueStore {
    use std::sync::Arc;

    use earnit_core::storage::{AvailabilityCache, MemoryBackend};

    SecureValueStore::with_cache(
        MemoryBackend::new(),
        PlainFileBackend::new(root),
        Arc::new(AvailabilityCache::new()),
    )
}
