use std::sync::OnceLock;

use crate::{
    config::AppConfig,
    error::{BotError, BotResult},
    service::ServiceRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: &'static AppConfig,
    pub service_registry: ServiceRegistry,
}

static APP_STATE: OnceLock<AppState> = OnceLock::new();

impl AppState {
    pub async fn new(config: &'static AppConfig) -> BotResult<Self> {
        let service_registry = ServiceRegistry::new(config).await?;

        Ok(Self {
            config,
            service_registry,
        })
    }

    pub fn set_global(state: AppState) -> BotResult<()> {
        APP_STATE
            .set(state)
            .map_err(|_| BotError::AppStateError("Failed to set global app state".into()))
    }

    pub fn get() -> BotResult<AppState> {
        APP_STATE
            .get()
            .cloned()
            .ok_or_else(|| BotError::AppStateError("App state not initialized".into()))
    }
}
