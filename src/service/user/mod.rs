mod model;

pub use model::*;

use chrono::{DateTime, Utc};
use libsql::{params, Row};
use teloxide::types::UserId;

use crate::storage::{read_opt_text, timestamp, StorageError, TursoClient};

const USER_COLUMNS: &str = "id, telegram_id, username, subscription_type, subscription_end_date, is_active, \
                            store_url, woo_api_key, woo_api_secret, torob_api_key, created_at";

#[derive(Clone)]
pub struct UserService {
    turso: TursoClient,
}

impl UserService {
    pub fn new(turso: TursoClient) -> Self {
        Self { turso }
    }

    /// First contact creates the record; later calls only refresh the display name.
    pub async fn register(&self, telegram_id: UserId, username: &str) -> Result<User, StorageError> {
        self.turso
            .connection()
            .execute(
                "INSERT INTO users (telegram_id, username, created_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(telegram_id) DO UPDATE SET username = excluded.username",
                params![telegram_id.0 as i64, username, Utc::now().timestamp()],
            )
            .await?;

        self.get_by_telegram_id(telegram_id)
            .await?
            .ok_or_else(|| StorageError::Other(format!("user {telegram_id} missing after registration")))
    }

    pub async fn get_by_telegram_id(&self, telegram_id: UserId) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1 LIMIT 1");
        self.query_one(&sql, telegram_id.0 as i64).await
    }

    #[cfg(test)]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 LIMIT 1");
        self.query_one(&sql, id).await
    }

    pub async fn set_storefront_credentials(
        &self,
        id: i64,
        store_url: &str,
        encrypted_key: &str,
        encrypted_secret: &str,
    ) -> Result<(), StorageError> {
        self.turso
            .connection()
            .execute(
                "UPDATE users SET store_url = ?1, woo_api_key = ?2, woo_api_secret = ?3 WHERE id = ?4",
                params![store_url, encrypted_key, encrypted_secret, id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_torob_credentials(&self, id: i64, encrypted_token: &str) -> Result<(), StorageError> {
        self.turso
            .connection()
            .execute(
                "UPDATE users SET torob_api_key = ?1 WHERE id = ?2",
                params![encrypted_token, id],
            )
            .await?;
        Ok(())
    }

    pub async fn update_subscription(
        &self,
        id: i64,
        tier: Tier,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        self.turso
            .connection()
            .execute(
                "UPDATE users SET subscription_type = ?1, subscription_end_date = ?2 WHERE id = ?3",
                params![tier.as_str(), timestamp::to_value(ends_at), id],
            )
            .await?;
        Ok(())
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), StorageError> {
        self.turso
            .connection()
            .execute(
                "UPDATE users SET is_active = ?1 WHERE id = ?2",
                params![active as i64, id],
            )
            .await?;
        Ok(())
    }

    async fn query_one(&self, sql: &str, key: i64) -> Result<Option<User>, StorageError> {
        let mut rows = self.turso.connection().query(sql, params![key]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

fn user_from_row(row: &Row) -> Result<User, StorageError> {
    let tier = row
        .get::<String>(3)?
        .parse::<Tier>()
        .map_err(StorageError::InvalidRow)?;

    Ok(User {
        id: row.get::<i64>(0)?,
        telegram_id: UserId(row.get::<i64>(1)? as u64),
        username: row.get::<String>(2)?,
        tier,
        subscription_end: timestamp::read_opt(row, 4)?,
        is_active: row.get::<i64>(5)? != 0,
        store_url: read_opt_text(row, 6)?,
        woo_api_key: read_opt_text(row, 7)?,
        woo_api_secret: read_opt_text(row, 8)?,
        torob_api_key: read_opt_text(row, 9)?,
        created_at: timestamp::read(row, 10)?,
    })
}
