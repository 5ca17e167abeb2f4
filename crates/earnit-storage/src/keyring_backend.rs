use async_trait::async_trait;
use earnit_core::storage::{BackendError, KeyValueBackend};
use tracing::{debug, instrument};

/// Targets where the `keyring` crate has a native credential store.
pub const PLATFORM_SUPPORTED: bool = cfg!(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "windows",
    target_os = "linux"
));

const PROBE_ACCOUNT: &str = "__earnit_probe__";

/// OS credential store backend. Each key is stored as its own account under `service`,
/// kept in the platform's device-local store. On Linux the keyutils cache is backed by
/// secret-service so entries survive a reboot.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, BackendError> {
        if !PLATFORM_SUPPORTED {
            return Err(BackendError::Unavailable { backend: "keyring" });
        }
        keyring::Entry::new(&self.service, key).map_err(keyring_err)
    }
}

#[async_trait]
impl KeyValueBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    #[instrument(skip_all, fields(service = %self.service))]
    async fn probe(&self) -> Result<bool, BackendError> {
        if !PLATFORM_SUPPORTED {
            return Ok(false);
        }
        // Keyring operations are synchronous; wrap in async for trait compatibility.
        let entry = match keyring::Entry::new(&self.service, PROBE_ACCOUNT) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("keyring entry creation failed: {err}");
                return Ok(false);
            }
        };
        availability_from_lookup(entry.get_password())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entry(key)?.set_password(value).map_err(keyring_err)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(keyring_err(err)),
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(keyring_err(err)),
        }
    }
}

/// Decide availability from a lookup of the probe entry: a missing entry still proves
/// the store works, while access or platform failures mean it cannot be used.
fn availability_from_lookup(
    lookup: Result<String, keyring::Error>,
) -> Result<bool, BackendError> {
    match lookup {
        Ok(_) | Err(keyring::Error::NoEntry) => Ok(true),
        Err(keyring::Error::NoStorageAccess(err))
        | Err(keyring::Error::PlatformFailure(err)) => {
            debug!("keyring not usable: {err}");
            Ok(false)
        }
        Err(err) => Err(keyring_err(err)),
    }
}

fn keyring_err(err: keyring::Error) -> BackendError {
    BackendError::Storage {
        reason: format!("keyring: {err}"),
    }
}
