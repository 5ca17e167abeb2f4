//! Concrete backends for the secure value store.
//! The OS credential store is the preferred home; plain files are the legacy fallback.

pub mod keyring_backend;
pub mod plain_file_backend;
