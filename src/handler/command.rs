use std::sync::Arc;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::bot::TelegramBot;
use crate::command::{self, Command};
use crate::config::AppConfig;
use crate::error::HandlerResult;
use crate::service::{conversation::MenuAction, ConversationEngine};

use super::{report_failure, sender_of};

async fn handle_command(
    bot: TelegramBot,
    engine: Arc<ConversationEngine>,
    msg: Message,
    cmd: Command,
) -> HandlerResult<()> {
    let Some(sender) = msg.from.as_ref().map(sender_of) else {
        return Ok(());
    };

    if cmd == Command::Start && AppConfig::get()?.admin.is_admin(sender.id) {
        command::setup_admin_commands(&bot, msg.chat.id).await?;
    }

    let result = match cmd {
        Command::Start => engine.on_start(&sender).await,
        Command::Help => engine.on_help(&sender).await,
        Command::Search => engine.on_menu(&sender, MenuAction::SearchProduct).await,
        Command::Settings => engine.on_menu(&sender, MenuAction::ApiSettings).await,
        Command::Status => engine.on_status(&sender).await,
        Command::Grant {
            telegram_id,
            tier,
            days,
        } => engine.on_grant(&sender, telegram_id, &tier, days).await,
        Command::Deactivate(telegram_id) => engine.on_deactivate(&sender, telegram_id).await,
    };

    report_failure(&bot, msg.chat.id, result).await
}

/// `/grant` with missing or malformed arguments never reaches `filter_command`.
async fn handle_unknown_command(bot: TelegramBot, msg: Message) -> HandlerResult<()> {
    let text = msg.text().unwrap_or_default();
    let reply = if text.starts_with("/grant") {
        t!("admin.grant_usage")
    } else {
        t!("commands.unknown_command")
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some_and(|text| text.starts_with('/')))
                .endpoint(handle_unknown_command),
        )
}
