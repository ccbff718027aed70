mod callback;
mod command;
mod keyboard;
mod message;
mod messenger;

pub use messenger::TelegramMessenger;

use callback::get_callback_handler;
use command::get_command_handler;
use message::get_message_handler;
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::{ChatId, User},
};

use crate::{
    bot::TelegramBot,
    error::HandlerResult,
    service::{Sender, ServiceError},
};

pub fn get_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(get_command_handler())
        .branch(get_message_handler())
        .branch(get_callback_handler())
}

pub(crate) fn sender_of(user: &User) -> Sender {
    Sender {
        id: user.id,
        name: user.first_name.clone(),
    }
}

/// Logs a failed conversation step and tells the user something went wrong.
pub(crate) async fn report_failure(
    bot: &TelegramBot,
    chat_id: ChatId,
    result: Result<(), ServiceError>,
) -> HandlerResult<()> {
    if let Err(e) = result {
        error!("Failed to handle update for chat {}: {}", chat_id, e);
        bot.send_message(chat_id, t!("errors.generic")).await?;
    }
    Ok(())
}
