use async_trait::async_trait;
use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, UserId},
};

use crate::{
    bot::TelegramBot,
    service::{Keyboard, Messenger, ServiceError},
};

use super::keyboard::to_inline_keyboard;

/// Sends conversation replies through the Bot API. Private chats share the user's id.
pub struct TelegramMessenger {
    bot: TelegramBot,
}

impl TelegramMessenger {
    pub fn new(bot: TelegramBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, user: UserId, text: String, keyboard: Option<Keyboard>) -> Result<(), ServiceError> {
        let mut request = self.bot.send_message(ChatId::from(user), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_inline_keyboard(&keyboard));
        }

        request.await.map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(())
    }
}
