use chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};
use teloxide::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Tier {
    Free,
    Basic,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Tier::Free)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "basic" => Ok(Tier::Basic),
            "premium" => Ok(Tier::Premium),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// A registered bot user. Credential fields hold vault envelopes, never plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub telegram_id: UserId,
    pub username: String,
    pub tier: Tier,
    pub subscription_end: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub store_url: Option<String>,
    pub woo_api_key: Option<String>,
    pub woo_api_secret: Option<String>,
    pub torob_api_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_storefront_credentials(&self) -> bool {
        self.store_url.is_some() && self.woo_api_key.is_some() && self.woo_api_secret.is_some()
    }

    pub fn has_torob_credentials(&self) -> bool {
        self.torob_api_key.is_some()
    }
}
