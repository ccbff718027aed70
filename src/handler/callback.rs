use std::sync::Arc;

use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    prelude::*,
    types::CallbackQuery,
};

use crate::{bot::TelegramBot, error::HandlerResult, service::ConversationEngine};

use super::{report_failure, sender_of};

async fn handle_callback(bot: TelegramBot, engine: Arc<ConversationEngine>, q: CallbackQuery) -> HandlerResult<()> {
    // Stop the client spinner before doing the slow part.
    bot.answer_callback_query(q.id.clone()).cache_time(1).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let sender = sender_of(&q.from);
    let result = engine.on_callback(&sender, data).await;
    report_failure(&bot, ChatId::from(sender.id), result).await
}

pub fn get_callback_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_callback_query().endpoint(handle_callback)
}
