use chrono::{DateTime, Utc};

use crate::service::Tier;

#[derive(Debug, Clone, PartialEq)]
pub struct License {
    pub id: i64,
    pub key: String,
    pub user_id: i64,
    pub tier: Tier,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl License {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// Outcome of looking a key up among the active licenses.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseStatus {
    Valid(License),
    /// Was active but past its expiry; this check deactivated it.
    Expired(License),
    /// No active license with that key.
    Invalid,
}

impl LicenseStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseStatus::Valid(_))
    }
}
