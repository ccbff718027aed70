use async_trait::async_trait;
use teloxide::types::UserId;

use crate::service::ServiceError;

/// Outbound side of the conversation, implemented by the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, user: UserId, text: String, keyboard: Option<Keyboard>) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            data: action.as_data().to_string(),
        }
    }
}

/// Inline keyboard, one inner vec per row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// Callback payloads carried by the menu buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ApiSettings,
    SetWooApi,
    SetTorobApi,
    SearchProduct,
    AdvancedSettings,
    MainMenu,
}

impl MenuAction {
    pub fn as_data(&self) -> &'static str {
        match self {
            Self::ApiSettings => "api_settings",
            Self::SetWooApi => "set_woo_api",
            Self::SetTorobApi => "set_torob_api",
            Self::SearchProduct => "search_product",
            Self::AdvancedSettings => "advanced_settings",
            Self::MainMenu => "main_menu",
        }
    }

    pub fn from_data(data: &str) -> Option<Self> {
        match data {
            "api_settings" => Some(Self::ApiSettings),
            "set_woo_api" => Some(Self::SetWooApi),
            "set_torob_api" => Some(Self::SetTorobApi),
            "search_product" => Some(Self::SearchProduct),
            "advanced_settings" => Some(Self::AdvancedSettings),
            "main_menu" => Some(Self::MainMenu),
            _ => None,
        }
    }
}
