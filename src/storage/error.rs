use libsql::errors::Error as TursoError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Turso error: {0}")]
    Turso(#[from] TursoError),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
    #[error("Other error: {0}")]
    Other(String),
}
