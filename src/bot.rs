use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::Bot;

use crate::config::AppConfig;
use crate::error::{BotResult, HandlerResult};
use crate::handler::{get_handler, TelegramMessenger};
use crate::service::ConversationEngine;
use crate::state::AppState;
use crate::utils::http;

pub type TelegramBot = Throttle<Bot>;

pub struct BotService {
    pub bot: TelegramBot,
}

impl BotService {
    pub async fn new() -> BotResult<Self> {
        info!("Initializing AppState...");
        let config = AppConfig::get()?;
        let state = AppState::new(config).await?;
        AppState::set_global(state)?;
        info!("AppState initialized");

        let client = http::create_telegram_client()?;
        let bot = Bot::with_client(config.telegram.0.clone(), client).throttle(Limits::default());

        Ok(Self { bot })
    }

    pub async fn start(&self) -> HandlerResult<()> {
        info!("Testing connection to Telegram API...");
        match self.bot.get_me().await {
            Ok(_) => info!("Successfully connected to Telegram API"),
            Err(e) => {
                error!("Failed to connect to Telegram API: {:?}", e);
                return Err(anyhow::anyhow!("Failed to connect to Telegram API: {}", e).into());
            }
        }

        let bot = self.bot.clone();
        let state = AppState::get()?;

        crate::command::setup_user_commands(&bot).await?;

        let engine = Arc::new(ConversationEngine::new(
            state.service_registry.clone(),
            state.config.admin.clone(),
            state.config.source.currency.clone(),
            Arc::new(TelegramMessenger::new(bot.clone())),
        ));

        Dispatcher::builder(bot, get_handler())
            .dependencies(dptree::deps![engine])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
