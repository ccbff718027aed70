//! Transport-independent conversation handling.
//!
//! Each entry point first takes the sender's session lock and holds it until the
//! update is fully handled, so a user's messages never interleave.

mod messenger;
mod render;

pub use messenger::{Button, Keyboard, MenuAction, Messenger};

use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use teloxide::types::UserId;

use crate::{
    config::AdminConfig,
    utils::{parse_store_url, validate_consumer_key, validate_consumer_secret, validate_torob_token},
};

use super::{
    dialogue::{ConversationState, WooCredentialStep},
    ratelimit::QuotaDecision,
    Entitlement, LicenseError, ServiceError, ServiceRegistry, Tier, User,
};

/// Who sent an update.
#[derive(Debug, Clone)]
pub struct Sender {
    pub id: UserId,
    pub name: String,
}

#[derive(Clone)]
pub struct ConversationEngine {
    services: ServiceRegistry,
    admin: AdminConfig,
    currency: String,
    messenger: Arc<dyn Messenger>,
}

impl ConversationEngine {
    pub fn new(services: ServiceRegistry, admin: AdminConfig, currency: String, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            services,
            admin,
            currency,
            messenger,
        }
    }

    /// Registers the sender on first contact and resets their conversation.
    pub async fn on_start(&self, sender: &Sender) -> Result<(), ServiceError> {
        let mut state = self.services.sessions.lock(sender.id).await;

        let user = self.services.users.register(sender.id, &sender.name).await?;
        if !user.is_active {
            return self.reply(sender.id, t!("guards.disabled"), None).await;
        }

        *state = ConversationState::Idle;
        info!("User {} started a conversation", sender.id);

        self.reply(
            sender.id,
            t!("commands.start.welcome", name = sender.name.as_str()),
            Some(render::main_menu_keyboard()),
        )
        .await
    }

    pub async fn on_help(&self, sender: &Sender) -> Result<(), ServiceError> {
        let _state = self.services.sessions.lock(sender.id).await;
        self.reply(sender.id, t!("commands.help"), Some(render::main_menu_keyboard()))
            .await
    }

    pub async fn on_status(&self, sender: &Sender) -> Result<(), ServiceError> {
        let _state = self.services.sessions.lock(sender.id).await;

        let Some(user) = self.active_user(sender.id).await? else {
            return Ok(());
        };
        let entitlement = self.entitlement(&user).await?;

        let ends_at = if entitlement.downgraded { None } else { user.subscription_end };
        let sources = self.services.aggregator.configured_sources(&user, &entitlement);
        let sources = if sources.is_empty() {
            t!("status.no_sources").to_string()
        } else {
            sources.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        };

        let mut lines = vec![
            t!("status.summary", tier = entitlement.tier.as_str(), ends = render::expiry(ends_at)).to_string(),
            t!("status.sources", sources = sources).to_string(),
        ];
        if !entitlement.tier.is_paid() {
            let info = self.services.ratelimit.get_rate_limit_info(sender.id);
            lines.push(
                t!(
                    "status.free_quota",
                    used = info.used_today,
                    limit = info.daily_limit,
                    reset = info.reset_time
                )
                .to_string(),
            );
        }

        self.reply(sender.id, lines.join("\n"), Some(render::main_menu_keyboard()))
            .await
    }

    /// Free text, interpreted according to the sender's conversation state.
    pub async fn on_text_message(&self, sender: &Sender, text: &str) -> Result<(), ServiceError> {
        let mut state = self.services.sessions.lock(sender.id).await;

        if !self.services.ratelimit.check_rate_limit(sender.id) {
            return self.reply(sender.id, t!("guards.slow_down"), None).await;
        }
        let Some(user) = self.active_user(sender.id).await? else {
            return Ok(());
        };

        let text = text.trim();
        debug!("User {} sent text in state {}", sender.id, state.name());

        // Every branch below either leaves the state reset or puts back the step
        // that still needs input.
        match std::mem::take(&mut *state) {
            ConversationState::Idle => {
                self.reply(sender.id, t!("commands.main_menu"), Some(render::main_menu_keyboard()))
                    .await
            }
            ConversationState::AwaitingProductSearch => self.search_product(&user, text, &mut state).await,
            ConversationState::AwaitingWooCredentials(step) => {
                self.enter_woo_credentials(&user, step, text, &mut state).await
            }
            ConversationState::AwaitingTorobCredentials => self.enter_torob_token(&user, text, &mut state).await,
            ConversationState::AwaitingAdvancedSetting => self.enter_license_key(&user, text).await,
        }
    }

    /// Button presses. Unknown payloads fall back to the main menu.
    pub async fn on_callback(&self, sender: &Sender, data: &str) -> Result<(), ServiceError> {
        let action = MenuAction::from_data(data).unwrap_or_else(|| {
            debug!("Unknown callback data from {}: {:?}", sender.id, data);
            MenuAction::MainMenu
        });
        self.on_menu(sender, action).await
    }

    pub async fn on_menu(&self, sender: &Sender, action: MenuAction) -> Result<(), ServiceError> {
        let mut state = self.services.sessions.lock(sender.id).await;

        if !self.services.ratelimit.check_rate_limit(sender.id) {
            return self.reply(sender.id, t!("guards.slow_down"), None).await;
        }
        if self.active_user(sender.id).await?.is_none() {
            return Ok(());
        }

        let (next, text, keyboard) = match action {
            MenuAction::ApiSettings => (
                ConversationState::Idle,
                t!("settings.api_menu").to_string(),
                render::api_settings_keyboard(),
            ),
            MenuAction::SetWooApi => (
                ConversationState::AwaitingWooCredentials(WooCredentialStep::StoreUrl),
                t!("settings.woo_url_prompt").to_string(),
                render::back_keyboard(),
            ),
            MenuAction::SetTorobApi => (
                ConversationState::AwaitingTorobCredentials,
                t!("settings.torob_prompt").to_string(),
                render::back_keyboard(),
            ),
            MenuAction::SearchProduct => (
                ConversationState::AwaitingProductSearch,
                t!("search.prompt").to_string(),
                render::back_keyboard(),
            ),
            MenuAction::AdvancedSettings => (
                ConversationState::AwaitingAdvancedSetting,
                self.with_plans(t!("license.prompt")),
                render::back_keyboard(),
            ),
            MenuAction::MainMenu => (
                ConversationState::Idle,
                t!("commands.main_menu").to_string(),
                render::main_menu_keyboard(),
            ),
        };

        *state = next;
        self.reply(sender.id, text, Some(keyboard)).await
    }

    /// Admin only: issues a license for a registered user and sends them the key.
    /// `days == 0` issues a license that never expires.
    pub async fn on_grant(&self, sender: &Sender, telegram_id: u64, tier: &str, days: u32) -> Result<(), ServiceError> {
        let _state = self.services.sessions.lock(sender.id).await;

        if !self.require_admin(sender).await? {
            return Ok(());
        }
        let tier = match tier.parse::<Tier>() {
            Ok(tier) if tier.is_paid() => tier,
            _ => return self.reply(sender.id, t!("admin.grant_usage"), None).await,
        };
        let Some(target) = self.services.users.get_by_telegram_id(UserId(telegram_id)).await? else {
            return self
                .reply(sender.id, t!("admin.user_not_found", telegram_id = telegram_id), None)
                .await;
        };

        let expires_at = (days > 0).then(|| Utc::now() + TimeDelta::days(i64::from(days)));
        let license = self.services.licenses.issue(target.id, tier, expires_at).await?;
        info!("Admin {} granted a {} license to {}", sender.id, tier, target.telegram_id);

        self.reply(
            sender.id,
            t!(
                "admin.license_issued",
                tier = tier.as_str(),
                telegram_id = telegram_id,
                expires = render::expiry(expires_at),
                key = license.key.as_str()
            ),
            None,
        )
        .await?;

        // The target may have blocked the bot; the admin already has the key.
        if let Err(e) = self
            .reply(
                target.telegram_id,
                t!("admin.license_received", tier = tier.as_str(), key = license.key.as_str()),
                None,
            )
            .await
        {
            warn!("Could not deliver license to {}: {}", target.telegram_id, e);
        }
        Ok(())
    }

    /// Admin only: disables a user. The record is kept.
    pub async fn on_deactivate(&self, sender: &Sender, telegram_id: u64) -> Result<(), ServiceError> {
        let _state = self.services.sessions.lock(sender.id).await;

        if !self.require_admin(sender).await? {
            return Ok(());
        }
        let Some(target) = self.services.users.get_by_telegram_id(UserId(telegram_id)).await? else {
            return self
                .reply(sender.id, t!("admin.user_not_found", telegram_id = telegram_id), None)
                .await;
        };

        self.services.users.set_active(target.id, false).await?;
        info!("Admin {} deactivated user {}", sender.id, telegram_id);

        self.reply(sender.id, t!("admin.deactivated", telegram_id = telegram_id), None)
            .await
    }

    async fn search_product(&self, user: &User, query: &str, state: &mut ConversationState) -> Result<(), ServiceError> {
        if query.is_empty() {
            *state = ConversationState::AwaitingProductSearch;
            return self.reply(user.telegram_id, t!("search.empty_query"), None).await;
        }

        let entitlement = self.entitlement(user).await?;
        if self.services.aggregator.configured_sources(user, &entitlement).is_empty() {
            return self
                .reply(
                    user.telegram_id,
                    t!("search.no_sources"),
                    Some(render::api_settings_keyboard()),
                )
                .await;
        }

        let mut remaining = None;
        if !entitlement.tier.is_paid() {
            match self.services.ratelimit.consume_free_search(user.telegram_id) {
                QuotaDecision::Allowed { remaining: left } => remaining = Some(left),
                QuotaDecision::Exhausted { limit } => {
                    let text = self.with_plans(t!("search.quota_exhausted", limit = limit));
                    return self
                        .reply(user.telegram_id, text, Some(render::main_menu_keyboard()))
                        .await;
                }
            }
        }

        let result = self.services.aggregator.compare(user, &entitlement, query).await;

        let mut text = render::comparison(&result);
        if let Some(remaining) = remaining {
            text.push_str("\n\n");
            text.push_str(&t!("search.quota_remaining", remaining = remaining));
        }
        self.reply(user.telegram_id, text, Some(render::main_menu_keyboard()))
            .await
    }

    async fn enter_woo_credentials(
        &self,
        user: &User,
        step: WooCredentialStep,
        input: &str,
        state: &mut ConversationState,
    ) -> Result<(), ServiceError> {
        let (next, prompt) = match step {
            WooCredentialStep::StoreUrl => match parse_store_url(input) {
                Some(store_url) => (WooCredentialStep::ConsumerKey { store_url }, t!("settings.woo_key_prompt")),
                None => (WooCredentialStep::StoreUrl, t!("settings.woo_url_invalid")),
            },
            WooCredentialStep::ConsumerKey { store_url } if validate_consumer_key(input) => (
                WooCredentialStep::ConsumerSecret {
                    store_url,
                    consumer_key: input.to_string(),
                },
                t!("settings.woo_secret_prompt"),
            ),
            WooCredentialStep::ConsumerKey { store_url } => (
                WooCredentialStep::ConsumerKey { store_url },
                t!("settings.woo_key_invalid"),
            ),
            WooCredentialStep::ConsumerSecret {
                store_url,
                consumer_key,
            } if validate_consumer_secret(input) => {
                let encrypted_key = self.services.vault.encrypt(&consumer_key)?;
                let encrypted_secret = self.services.vault.encrypt(input)?;
                self.services
                    .users
                    .set_storefront_credentials(user.id, &store_url, &encrypted_key, &encrypted_secret)
                    .await?;
                info!("User {} saved WooCommerce credentials", user.telegram_id);

                return self
                    .reply(
                        user.telegram_id,
                        t!("settings.woo_saved", store_url = store_url.as_str()),
                        Some(render::main_menu_keyboard()),
                    )
                    .await;
            }
            step @ WooCredentialStep::ConsumerSecret { .. } => (step, t!("settings.woo_secret_invalid")),
        };

        *state = ConversationState::AwaitingWooCredentials(next);
        self.reply(user.telegram_id, prompt, Some(render::back_keyboard()))
            .await
    }

    async fn enter_torob_token(&self, user: &User, token: &str, state: &mut ConversationState) -> Result<(), ServiceError> {
        if !validate_torob_token(token) {
            *state = ConversationState::AwaitingTorobCredentials;
            return self
                .reply(user.telegram_id, t!("settings.torob_invalid"), Some(render::back_keyboard()))
                .await;
        }

        let encrypted = self.services.vault.encrypt(token)?;
        self.services.users.set_torob_credentials(user.id, &encrypted).await?;
        info!("User {} saved a Torob token", user.telegram_id);

        self.reply(
            user.telegram_id,
            t!("settings.torob_saved"),
            Some(render::main_menu_keyboard()),
        )
        .await
    }

    async fn enter_license_key(&self, user: &User, key: &str) -> Result<(), ServiceError> {
        let text = match self.services.subscriptions.activate_license(user, key).await {
            Ok(license) => t!(
                "license.activated",
                tier = license.tier.as_str(),
                ends = render::expiry(license.expires_at)
            )
            .to_string(),
            Err(ServiceError::License(LicenseError::Expired)) => self.with_plans(t!("license.expired")),
            Err(ServiceError::License(LicenseError::Invalid)) => self.with_plans(t!("license.invalid")),
            Err(e) => return Err(e),
        };

        self.reply(user.telegram_id, text, Some(render::main_menu_keyboard()))
            .await
    }

    fn with_plans(&self, message: impl std::fmt::Display) -> String {
        format!(
            "{}\n\n{}",
            message,
            render::plans(self.services.subscriptions.catalog(), &self.currency)
        )
    }

    /// Resolves the user's entitlement and tells them if it was just downgraded.
    async fn entitlement(&self, user: &User) -> Result<Entitlement, ServiceError> {
        let entitlement = self.services.subscriptions.resolve(user).await?;
        if entitlement.downgraded {
            self.reply(user.telegram_id, t!("subscription.downgraded"), None).await?;
        }
        Ok(entitlement)
    }

    /// The sender's record, or `None` after telling them why they cannot continue.
    async fn active_user(&self, id: UserId) -> Result<Option<User>, ServiceError> {
        match self.services.users.get_by_telegram_id(id).await? {
            None => {
                self.reply(id, t!("guards.unregistered"), None).await?;
                Ok(None)
            }
            Some(user) if !user.is_active => {
                self.reply(id, t!("guards.disabled"), None).await?;
                Ok(None)
            }
            Some(user) => Ok(Some(user)),
        }
    }

    async fn require_admin(&self, sender: &Sender) -> Result<bool, ServiceError> {
        if self.admin.is_admin(sender.id) {
            return Ok(true);
        }
        warn!("User {} tried to use an admin command", sender.id);
        self.reply(sender.id, t!("guards.not_admin"), None).await?;
        Ok(false)
    }

    async fn reply(&self, user: UserId, text: impl Into<String>, keyboard: Option<Keyboard>) -> Result<(), ServiceError> {
        self.messenger.send_message(user, text.into(), keyboard).await
    }
}
