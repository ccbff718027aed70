mod model;

pub use model::*;

use chrono::Utc;

use super::{
    license::{License, LicenseStatus},
    LicenseManager, ServiceError, Tier, User, UserService,
};

#[derive(Clone)]
pub struct SubscriptionService {
    catalog: TierCatalog,
    users: UserService,
    licenses: LicenseManager,
}

impl SubscriptionService {
    pub fn new(catalog: TierCatalog, users: UserService, licenses: LicenseManager) -> Self {
        Self {
            catalog,
            users,
            licenses,
        }
    }

    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    /// Resolves the user's current tier. A paid tier is only kept while the user owns
    /// an active, unexpired license of that tier; checking applies the lazy expiry.
    /// Licenses of other tiers are left untouched.
    pub async fn resolve(&self, user: &User) -> Result<Entitlement, ServiceError> {
        if !user.tier.is_paid() {
            return Ok(self.entitlement(Tier::Free, false));
        }

        let mut license_ok = false;
        for license in self.licenses.active_for_user(user.id).await? {
            if license.tier != user.tier {
                continue;
            }
            if matches!(self.licenses.check(&license.key).await?, LicenseStatus::Valid(_)) {
                license_ok = true;
                break;
            }
        }
        let period_ok = user.subscription_end.map_or(true, |ends_at| ends_at >= Utc::now());

        if license_ok && period_ok {
            return Ok(self.entitlement(user.tier, false));
        }

        info!(
            "User {} lost the {} tier (license ok: {}, period ok: {})",
            user.telegram_id, user.tier, license_ok, period_ok
        );
        self.users.update_subscription(user.id, Tier::Free, None).await?;

        Ok(self.entitlement(Tier::Free, true))
    }

    /// Applies a license the user typed in to their subscription.
    pub async fn activate_license(&self, user: &User, key: &str) -> Result<License, ServiceError> {
        let license = self.licenses.activate(user.id, key).await?;
        self.users
            .update_subscription(user.id, license.tier, license.expires_at)
            .await?;

        info!("User {} activated the {} tier", user.telegram_id, license.tier);
        Ok(license)
    }

    fn entitlement(&self, tier: Tier, downgraded: bool) -> Entitlement {
        Entitlement {
            tier,
            features: self.catalog.features(tier).to_vec(),
            downgraded,
        }
    }
}
