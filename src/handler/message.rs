use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::{bot::TelegramBot, error::HandlerResult, service::ConversationEngine};

use super::{report_failure, sender_of};

async fn handle_text(bot: TelegramBot, engine: Arc<ConversationEngine>, msg: Message, text: String) -> HandlerResult<()> {
    let Some(sender) = msg.from.as_ref().map(sender_of) else {
        return Ok(());
    };

    let result = engine.on_text_message(&sender, &text).await;
    report_failure(&bot, msg.chat.id, result).await
}

async fn handle_message_unsupported(bot: TelegramBot, msg: Message) -> HandlerResult<()> {
    bot.send_message(msg.chat.id, t!("errors.text_only")).await?;
    Ok(())
}

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .branch(
            dptree::filter_map(|msg: Message| msg.text().map(ToOwned::to_owned)).endpoint(handle_text),
        )
        .branch(dptree::endpoint(handle_message_unsupported))
}
