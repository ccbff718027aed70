use chrono::{DateTime, TimeZone, Utc};
use libsql::{Builder, Connection, Database, Row, Value};
use std::sync::Arc;

use super::StorageError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER NOT NULL UNIQUE,
    username TEXT NOT NULL DEFAULT '',
    subscription_type TEXT NOT NULL DEFAULT 'free',
    subscription_end_date INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    store_url TEXT,
    woo_api_key TEXT,
    woo_api_secret TEXT,
    torob_api_key TEXT,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS licenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    license_key TEXT NOT NULL UNIQUE,
    user_id INTEGER NOT NULL REFERENCES users(id),
    type TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    expires_at INTEGER,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_licenses_user ON licenses(user_id, is_active);
";

#[derive(Clone)]
pub struct TursoClient {
    _db: Arc<Database>,
    conn: Connection,
}

impl TursoClient {
    pub async fn connect_remote(url: &str, token: &str) -> Result<Self, StorageError> {
        info!("Initializing TursoClient...");
        let db = Builder::new_remote(url.to_string(), token.to_string()).build().await?;
        let client = Self::from_database(db).await?;
        info!("TursoClient initialized");
        Ok(client)
    }

    /// Local database, `":memory:"` for tests.
    pub async fn connect_local(path: &str) -> Result<Self, StorageError> {
        let db = Builder::new_local(path).build().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self, StorageError> {
        let conn = db.connect()?;
        conn.execute_batch(SCHEMA).await?;

        Ok(Self {
            _db: Arc::new(db),
            conn,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub mod timestamp {
    use super::*;

    pub fn to_value(at: Option<DateTime<Utc>>) -> Value {
        match at {
            Some(at) => Value::Integer(at.timestamp()),
            None => Value::Null,
        }
    }

    pub fn from_secs(secs: i64) -> Result<DateTime<Utc>, StorageError> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| StorageError::InvalidRow(format!("timestamp out of range: {secs}")))
    }

    pub fn read(row: &Row, idx: i32) -> Result<DateTime<Utc>, StorageError> {
        from_secs(row.get::<i64>(idx)?)
    }

    pub fn read_opt(row: &Row, idx: i32) -> Result<Option<DateTime<Utc>>, StorageError> {
        match row.get_value(idx)? {
            Value::Null => Ok(None),
            Value::Integer(secs) => from_secs(secs).map(Some),
            other => Err(StorageError::InvalidRow(format!("expected timestamp, got {other:?}"))),
        }
    }
}

pub(crate) fn read_opt_text(row: &Row, idx: i32) -> Result<Option<String>, StorageError> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(StorageError::InvalidRow(format!("expected text, got {other:?}"))),
    }
}
