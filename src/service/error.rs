use crate::{source::SourceError, storage::StorageError};

use super::{LicenseError, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
    #[error("License error: {0}")]
    License(#[from] LicenseError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Transport error: {0}")]
    Transport(String),
}
