use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    #[error("License is unknown, inactive or owned by another user")]
    Invalid,
    #[error("License has expired")]
    Expired,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<libsql::Error> for LicenseError {
    fn from(error: libsql::Error) -> Self {
        LicenseError::Storage(StorageError::Turso(error))
    }
}
