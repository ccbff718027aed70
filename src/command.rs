use teloxide::{
    macros::BotCommands,
    payloads::SetMyCommandsSetters,
    prelude::Requester,
    types::{BotCommand, BotCommandScope, ChatId, Recipient},
};

use crate::{bot::TelegramBot, error::HandlerResult};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Help,
    Search,
    Settings,
    Status,
    #[command(parse_with = "split")]
    Grant { telegram_id: u64, tier: String, days: u32 },
    Deactivate(u64),
}

impl Command {
    pub fn user_commands() -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", t!("commands.description.start")),
            BotCommand::new("search", t!("commands.description.search")),
            BotCommand::new("settings", t!("commands.description.settings")),
            BotCommand::new("status", t!("commands.description.status")),
            BotCommand::new("help", t!("commands.description.help")),
        ]
    }

    pub fn admin_commands() -> Vec<BotCommand> {
        let mut commands = Self::user_commands();
        commands.push(BotCommand::new("grant", t!("commands.description.grant")));
        commands.push(BotCommand::new("deactivate", t!("commands.description.deactivate")));
        commands
    }
}

pub async fn setup_user_commands(bot: &TelegramBot) -> HandlerResult<()> {
    bot.delete_my_commands().await?;
    bot.set_my_commands(Command::user_commands()).await?;
    Ok(())
}

pub async fn setup_admin_commands(bot: &TelegramBot, chat_id: ChatId) -> HandlerResult<()> {
    bot.set_my_commands(Command::admin_commands())
        .scope(BotCommandScope::Chat {
            chat_id: Recipient::Id(chat_id),
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::utils::command::BotCommands as _;

    #[test]
    fn test_parse_grant() {
        let cmd = Command::parse("/grant 42 premium 30", "pricebot").unwrap();
        assert_eq!(
            cmd,
            Command::Grant {
                telegram_id: 42,
                tier: "premium".into(),
                days: 30
            }
        );
    }

    #[test]
    fn test_parse_grant_rejects_missing_args() {
        assert!(Command::parse("/grant 42 premium", "pricebot").is_err());
        assert!(Command::parse("/grant abc premium 3", "pricebot").is_err());
    }

    #[test]
    fn test_parse_deactivate_and_plain_commands() {
        assert_eq!(Command::parse("/deactivate 7", "pricebot").unwrap(), Command::Deactivate(7));
        assert_eq!(Command::parse("/search", "pricebot").unwrap(), Command::Search);
        assert_eq!(Command::parse("/status@pricebot", "pricebot").unwrap(), Command::Status);
    }
}
