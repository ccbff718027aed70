use std::sync::Arc;

use crate::{
    config::AppConfig,
    source::{HttpSourceBuilder, SourceBuilder},
    storage::TursoClient,
};

pub mod aggregator;
pub mod conversation;
pub mod dialogue;
mod error;
pub mod license;
mod ratelimit;
pub mod subscription;
mod user;
pub mod vault;

pub use aggregator::PriceAggregator;
pub use conversation::{Button, ConversationEngine, Keyboard, Messenger, Sender};
pub use dialogue::SessionStore;
pub use error::ServiceError;
pub use license::{LicenseError, LicenseManager};
pub use ratelimit::RateLimitService;
pub use subscription::{Entitlement, Feature, SubscriptionService, TierCatalog, TierPlan};
pub use user::*;
pub use vault::{CredentialVault, VaultError};

#[derive(Clone)]
pub struct ServiceRegistry {
    pub users: UserService,
    pub licenses: LicenseManager,
    pub subscriptions: SubscriptionService,
    pub vault: CredentialVault,
    pub aggregator: PriceAggregator,
    pub sessions: SessionStore,
    pub ratelimit: RateLimitService,
}

impl ServiceRegistry {
    pub async fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing service registry");

        let turso = TursoClient::connect_remote(&config.storage.turso_url, &config.storage.turso_token).await?;
        let vault = CredentialVault::from_base64_key(&config.vault.encryption_key)?;
        let builder = HttpSourceBuilder::new(&config.source)?;

        let registry = Self::with_parts(turso, vault, Arc::new(builder), config);

        info!("Service registry initialized");
        Ok(registry)
    }

    /// Wires the services over an existing database, vault and source builder.
    pub fn with_parts(
        turso: TursoClient,
        vault: CredentialVault,
        builder: Arc<dyn SourceBuilder>,
        config: &AppConfig,
    ) -> Self {
        let users = UserService::new(turso.clone());
        let licenses = LicenseManager::new(turso);
        let subscriptions = SubscriptionService::new(config.tiers.clone(), users.clone(), licenses.clone());
        let aggregator = PriceAggregator::new(vault.clone(), builder, config.source.timeout);

        Self {
            users,
            licenses,
            subscriptions,
            vault,
            aggregator,
            sessions: SessionStore::default(),
            ratelimit: RateLimitService::new(&config.ratelimit),
        }
    }
}
