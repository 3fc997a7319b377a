//! Filesystem contract writer.

use std::path::Path;

use async_trait::async_trait;
use wirepact_core::{ContractWriter, PersistError};

/// Writes contracts to disk, creating the pact directory on first use.
pub(crate) struct FsContractWriter;

#[async_trait]
impl ContractWriter for FsContractWriter {
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), PersistError> {
        let io_error = |source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
        }
        tokio::fs::write(path, contents).await.map_err(io_error)
    }
}
