#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("Stored credential is corrupt or was encrypted with another key")]
    CorruptCredential,
    #[error("Encryption failed")]
    EncryptionFailed,
}
