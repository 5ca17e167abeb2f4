use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use earnit_core::storage::{BackendError, KeyValueBackend};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Unencrypted file-per-key backend. Used where no credential store exists and as
/// the legacy home values are migrated out of.
pub struct PlainFileBackend {
    root: PathBuf,
}

impl PlainFileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(sanitize_key(key))
    }
}

#[async_trait]
impl KeyValueBackend for PlainFileBackend {
    fn name(&self) -> &'static str {
        "plain-file"
    }

    async fn probe(&self) -> Result<bool, BackendError> {
        fs::create_dir_all(&self.root).map_err(BackendError::storage)?;
        Ok(true)
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
        write_atomic(&self.path_for(key), value.as_bytes())
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BackendError::storage(err)),
        }
    }

    #[instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BackendError::storage(err)),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let parent = path.parent().ok_or_else(|| BackendError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(BackendError::storage)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(BackendError::storage)?;
    tmp.write_all(bytes).map_err(BackendError::storage)?;
    tmp.flush().map_err(BackendError::storage)?;
    tmp.persist(path)
        .map_err(|e| BackendError::storage(e.error))?;
    Ok(())
}

// Keys like `parentCode` are safe already, but arbitrary keys must not escape the root.
fn sanitize_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key)
}
