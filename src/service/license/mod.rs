//! License records and their lazy expiry.
//!
//! Expiry is only enforced when a key is checked: a license past its
//! `expires_at` keeps `is_active = 1` in storage until the next check flips it.
//! There is no background sweep, so an expired license may look active in the
//! table until then.

mod error;
mod model;

pub use error::LicenseError;
pub use model::*;

use chrono::{DateTime, Utc};
use libsql::{params, Row};
use uuid::Uuid;

use crate::{
    service::Tier,
    storage::{timestamp, StorageError, TursoClient},
    utils::fingerprint,
};

const LICENSE_COLUMNS: &str = "id, license_key, user_id, type, is_active, expires_at, created_at";

pub fn generate_license_key() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone)]
pub struct LicenseManager {
    turso: TursoClient,
}

impl LicenseManager {
    pub fn new(turso: TursoClient) -> Self {
        Self { turso }
    }

    pub async fn issue(
        &self,
        user_id: i64,
        tier: Tier,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<License, LicenseError> {
        let key = generate_license_key();
        let created_at = Utc::now();

        self.turso
            .connection()
            .execute(
                "INSERT INTO licenses (license_key, user_id, type, is_active, expires_at, created_at) \
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)",
                params![
                    key.as_str(),
                    user_id,
                    tier.as_str(),
                    timestamp::to_value(expires_at),
                    created_at.timestamp()
                ],
            )
            .await?;

        info!(
            "Issued {} license {} for user {}",
            tier,
            fingerprint(&key),
            user_id
        );

        self.find_by_key(&key)
            .await?
            .ok_or_else(|| LicenseError::Storage(StorageError::Other("license missing after insert".into())))
    }

    /// Looks the key up among active licenses and deactivates it if it has expired.
    pub async fn check(&self, key: &str) -> Result<LicenseStatus, LicenseError> {
        let key = key.trim();
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE license_key = ?1 AND is_active = 1 LIMIT 1");
        let mut rows = self.turso.connection().query(&sql, params![key]).await?;

        let Some(row) = rows.next().await? else {
            debug!("License {} not found among active licenses", fingerprint(key));
            return Ok(LicenseStatus::Invalid);
        };
        let mut license = license_from_row(&row)?;
        drop(rows);

        if !license.is_expired_at(Utc::now()) {
            return Ok(LicenseStatus::Valid(license));
        }

        // Guarded on is_active so concurrent checks flip the flag at most once.
        let flipped = self
            .turso
            .connection()
            .execute(
                "UPDATE licenses SET is_active = 0 WHERE id = ?1 AND is_active = 1",
                params![license.id],
            )
            .await?;

        if flipped > 0 {
            info!("License {} expired, deactivated", fingerprint(key));
        }

        license.is_active = false;
        Ok(LicenseStatus::Expired(license))
    }

    pub async fn validate(&self, key: &str) -> Result<bool, LicenseError> {
        Ok(self.check(key).await?.is_valid())
    }

    /// Active licenses owned by the user, newest first, without checking their expiry.
    pub async fn active_for_user(&self, user_id: i64) -> Result<Vec<License>, LicenseError> {
        let sql = format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE user_id = ?1 AND is_active = 1 \
             ORDER BY created_at DESC, id DESC"
        );
        let mut rows = self.turso.connection().query(&sql, params![user_id]).await?;

        let mut licenses = Vec::new();
        while let Some(row) = rows.next().await? {
            licenses.push(license_from_row(&row)?);
        }
        Ok(licenses)
    }

    /// Checks a key a user typed in and returns it if it is valid and theirs.
    pub async fn activate(&self, user_id: i64, key: &str) -> Result<License, LicenseError> {
        match self.check(key).await? {
            LicenseStatus::Valid(license) if license.user_id == user_id => Ok(license),
            LicenseStatus::Expired(license) if license.user_id == user_id => Err(LicenseError::Expired),
            _ => {
                warn!("User {} failed to activate license {}", user_id, fingerprint(key.trim()));
                Err(LicenseError::Invalid)
            }
        }
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<License>, LicenseError> {
        let sql = format!("SELECT {LICENSE_COLUMNS} FROM licenses WHERE license_key = ?1 LIMIT 1");
        let mut rows = self.turso.connection().query(&sql, params![key]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(license_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

fn license_from_row(row: &Row) -> Result<License, StorageError> {
    let tier = row
        .get::<String>(3)?
        .parse::<Tier>()
        .map_err(StorageError::InvalidRow)?;

    Ok(License {
        id: row.get::<i64>(0)?,
        key: row.get::<String>(1)?,
        user_id: row.get::<i64>(2)?,
        tier,
        is_active: row.get::<i64>(4)? != 0,
        expires_at: timestamp::read_opt(row, 5)?,
        created_at: timestamp::read(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use teloxide::types::UserId;

    use crate::service::UserService;

    async fn setup() -> (LicenseManager, UserService, i64) {
        let turso = TursoClient::connect_local(":memory:").await.unwrap();
        let users = UserService::new(turso.clone());
        let user = users.register(UserId(1), "owner").await.unwrap();
        (LicenseManager::new(turso), users, user.id)
    }

    async fn active_flag(manager: &LicenseManager, key: &str) -> bool {
        manager.find_by_key(key).await.unwrap().unwrap().is_active
    }

    #[test]
    fn test_generated_keys_are_unique_uuids() {
        let a = generate_license_key();
        let b = generate_license_key();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_key_is_invalid() {
        let (manager, _, _) = setup().await;
        assert!(!manager.validate("no-such-key").await.unwrap());
        assert_eq!(manager.check("no-such-key").await.unwrap(), LicenseStatus::Invalid);
    }

    #[tokio::test]
    async fn test_never_expiring_license_stays_valid() {
        let (manager, _, user_id) = setup().await;
        let license = manager.issue(user_id, Tier::Premium, None).await.unwrap();

        for _ in 0..3 {
            assert!(manager.validate(&license.key).await.unwrap());
        }
        assert!(active_flag(&manager, &license.key).await);
    }

    #[tokio::test]
    async fn test_future_expiry_is_valid_without_mutation() {
        let (manager, _, user_id) = setup().await;
        let license = manager
            .issue(user_id, Tier::Basic, Some(Utc::now() + Duration::days(30)))
            .await
            .unwrap();

        assert!(manager.validate(&license.key).await.unwrap());
        assert!(active_flag(&manager, &license.key).await);
    }

    #[tokio::test]
    async fn test_past_expiry_is_deactivated_on_first_check_only() {
        let (manager, _, user_id) = setup().await;
        let license = manager
            .issue(user_id, Tier::Premium, Some(Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        // Nothing sweeps the table: still active until someone validates.
        assert!(active_flag(&manager, &license.key).await);

        let first = manager.check(&license.key).await.unwrap();
        assert!(matches!(first, LicenseStatus::Expired(ref l) if !l.is_active));
        assert!(!active_flag(&manager, &license.key).await);

        // Second check no longer finds an active row, so nothing is mutated again.
        assert_eq!(manager.check(&license.key).await.unwrap(), LicenseStatus::Invalid);
        assert!(!manager.validate(&license.key).await.unwrap());
        assert!(!active_flag(&manager, &license.key).await);
    }

    #[tokio::test]
    async fn test_active_for_user_newest_first() {
        let (manager, _, user_id) = setup().await;
        assert!(manager.active_for_user(user_id).await.unwrap().is_empty());

        let oldest = manager.issue(user_id, Tier::Basic, None).await.unwrap();
        let newest = manager.issue(user_id, Tier::Premium, None).await.unwrap();
        let lapsed = manager
            .issue(user_id, Tier::Basic, Some(Utc::now() - Duration::hours(1)))
            .await
            .unwrap();
        manager.check(&lapsed.key).await.unwrap();

        let keys: Vec<_> = manager
            .active_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.key)
            .collect();
        assert_eq!(keys, vec![newest.key, oldest.key]);
    }

    #[tokio::test]
    async fn test_activate_checks_owner_and_expiry() {
        let (manager, users, owner_id) = setup().await;
        let stranger = users.register(UserId(2), "stranger").await.unwrap();

        let license = manager.issue(owner_id, Tier::Premium, None).await.unwrap();
        assert!(matches!(
            manager.activate(stranger.id, &license.key).await,
            Err(LicenseError::Invalid)
        ));
        let activated = manager.activate(owner_id, &format!("  {}\n", license.key)).await.unwrap();
        assert_eq!(activated.tier, Tier::Premium);

        let expired = manager
            .issue(owner_id, Tier::Basic, Some(Utc::now() - Duration::minutes(5)))
            .await
            .unwrap();
        assert!(matches!(
            manager.activate(owner_id, &expired.key).await,
            Err(LicenseError::Expired)
        ));
        assert!(matches!(
            manager.activate(owner_id, &expired.key).await,
            Err(LicenseError::Invalid)
        ));
    }
}
