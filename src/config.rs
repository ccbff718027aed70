use rust_decimal::Decimal;
use shuttle_runtime::SecretStore;
use std::{sync::OnceLock, time::Duration};
use teloxide::types::UserId;

use crate::service::{Feature, Tier, TierCatalog, TierPlan};

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

const DEFAULT_TOROB_API_BASE_URL: &str = "https://api.torob.com/v4";
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PRICE_CURRENCY: &str = "IRT";
const DEFAULT_FREE_TIER_DAILY_LIMIT: u32 = 10;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_BASIC_TIER_PRICE: i64 = 100_000;
const DEFAULT_PREMIUM_TIER_PRICE: i64 = 300_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing secret: {0}")]
    Missing(String),
    #[error("Invalid secret {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("Config already initialized")]
    AlreadyInitialized,
    #[error("Config not initialized")]
    NotInitialized,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub vault: VaultConfig,
    pub admin: AdminConfig,
    pub source: SourceConfig,
    pub ratelimit: RateLimitConfig,
    pub tiers: TierCatalog,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig(pub String);

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub turso_url: String,
    pub turso_token: String,
}

#[derive(Clone)]
pub struct VaultConfig {
    /// Base64 encoded 32 byte key. Losing it makes every stored credential unreadable.
    pub encryption_key: String,
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig").field("encryption_key", &"<redacted>").finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct AdminConfig {
    pub telegram_user_ids: Vec<UserId>,
}

impl AdminConfig {
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.telegram_user_ids.contains(&user_id)
    }
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub torob_base_url: String,
    pub timeout: Duration,
    pub currency: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            torob_base_url: DEFAULT_TOROB_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
            currency: DEFAULT_PRICE_CURRENCY.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub free_daily_limit: u32,
    pub per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            free_daily_limit: DEFAULT_FREE_TIER_DAILY_LIMIT,
            per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
        }
    }
}

impl AppConfig {
    pub fn set_global(config: AppConfig) -> Result<(), ConfigError> {
        APP_CONFIG.set(config).map_err(|_| ConfigError::AlreadyInitialized)
    }

    pub fn get() -> Result<&'static AppConfig, ConfigError> {
        APP_CONFIG.get().ok_or(ConfigError::NotInitialized)
    }

    /// Builds the config from any key lookup, so tests can feed a plain map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = Secrets { lookup };

        let tiers = TierCatalog::new(vec![
            TierPlan {
                tier: Tier::Free,
                price: Decimal::ZERO,
                features: vec![Feature::WooCommercePrice, Feature::TorobComparison],
            },
            TierPlan {
                tier: Tier::Basic,
                price: Decimal::from(secrets.parse_or("BASIC_TIER_PRICE", DEFAULT_BASIC_TIER_PRICE)?),
                features: vec![Feature::WooCommercePrice, Feature::BasicComparison],
            },
            TierPlan {
                tier: Tier::Premium,
                price: Decimal::from(secrets.parse_or("PREMIUM_TIER_PRICE", DEFAULT_PREMIUM_TIER_PRICE)?),
                features: vec![
                    Feature::WooCommercePrice,
                    Feature::TorobComparison,
                    Feature::AutoPriceAdjust,
                    Feature::Reporting,
                ],
            },
        ]);

        Ok(Self {
            telegram: TelegramConfig(secrets.required("TELEGRAM_BOT_TOKEN")?),
            storage: StorageConfig {
                turso_url: secrets.required("TURSO_URL")?,
                turso_token: secrets.required("TURSO_TOKEN")?,
            },
            vault: VaultConfig {
                encryption_key: secrets.required("ENCRYPTION_KEY")?,
            },
            admin: AdminConfig {
                telegram_user_ids: secrets.admin_ids("ADMIN_TELEGRAM_USER_IDS")?,
            },
            source: SourceConfig {
                torob_base_url: secrets
                    .optional("TOROB_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TOROB_API_BASE_URL.to_string()),
                timeout: Duration::from_secs(secrets.parse_or("SOURCE_TIMEOUT_SECS", DEFAULT_SOURCE_TIMEOUT_SECS)?),
                currency: secrets
                    .optional("PRICE_CURRENCY")
                    .unwrap_or_else(|| DEFAULT_PRICE_CURRENCY.to_string()),
            },
            ratelimit: RateLimitConfig {
                free_daily_limit: secrets.parse_or("FREE_TIER_DAILY_LIMIT", DEFAULT_FREE_TIER_DAILY_LIMIT)?,
                per_minute: secrets.parse_or("RATE_LIMIT_PER_MINUTE", DEFAULT_RATE_LIMIT_PER_MINUTE)?,
            },
            tiers,
        })
    }
}

struct Secrets<F> {
    lookup: F,
}

impl<F> Secrets<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn admin_ids(&self, key: &str) -> Result<Vec<UserId>, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u64>().map(UserId).map_err(|e| ConfigError::Invalid {
                    key: key.to_string(),
                    reason: format!("{s}: {e}"),
                })
            })
            .collect()
    }
}

pub fn build_config(secret_store: &SecretStore) -> Result<AppConfig, ConfigError> {
    info!("Building AppConfig...");
    let config = AppConfig::from_lookup(|key| secret_store.get(key))?;
    info!("AppConfig built");
    Ok(config)
}
