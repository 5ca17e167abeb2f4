//! Key/value storage contracts and the dual-backend secure value store.

mod availability;
mod backend;
mod value_store;

pub use availability::AvailabilityCache;
pub use backend::{BackendError, KeyValueBackend, MemoryBackend, MemoryStats};
pub use value_store::{MigrationOutcome, Placement, SecureValueStore};
