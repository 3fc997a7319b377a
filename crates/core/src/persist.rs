use std::path::Path;

use async_trait::async_trait;

use crate::error::PersistError;

/// Destination for assembled contract documents.
#[async_trait]
pub trait ContractWriter: Send + Sync + 'static {
    /// Replace the contents of `path` with `contents`.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), PersistError>;
}
