use std::fmt;

/// Where a user is in the conversation. Lives in memory only; a restart puts
/// everyone back to `Idle`.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingProductSearch,
    AwaitingWooCredentials(WooCredentialStep),
    AwaitingTorobCredentials,
    /// The advanced settings menu, where a license key is entered.
    AwaitingAdvancedSetting,
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "none",
            Self::AwaitingProductSearch => "awaiting_product_search",
            Self::AwaitingWooCredentials(_) => "awaiting_woo_credentials",
            Self::AwaitingTorobCredentials => "awaiting_torob_credentials",
            Self::AwaitingAdvancedSetting => "awaiting_advanced_setting",
        }
    }
}

/// Storefront credentials are collected one message at a time; each step carries
/// what was entered so far.
#[derive(Clone, PartialEq, Eq)]
pub enum WooCredentialStep {
    StoreUrl,
    ConsumerKey { store_url: String },
    ConsumerSecret { store_url: String, consumer_key: String },
}

impl fmt::Debug for WooCredentialStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUrl => write!(f, "StoreUrl"),
            Self::ConsumerKey { store_url } => f.debug_struct("ConsumerKey").field("store_url", store_url).finish(),
            Self::ConsumerSecret { store_url, .. } => f
                .debug_struct("ConsumerSecret")
                .field("store_url", store_url)
                .field("consumer_key", &"<redacted>")
                .finish(),
        }
    }
}
