use async_trait::async_trait;

use super::{FetchOutcome, SourceKind};

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Looks up the best match for `query`. Never fails: every failure mode is a
    /// `FetchOutcome::TransientError`.
    async fn fetch_price(&self, query: &str) -> FetchOutcome;
}

/// Decrypted credentials for one source, as handed to a [`SourceBuilder`].
pub enum SourceCredentials {
    WooCommerce {
        store_url: String,
        consumer_key: String,
        consumer_secret: String,
    },
    Torob {
        token: String,
    },
}

impl SourceCredentials {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::WooCommerce { .. } => SourceKind::WooCommerce,
            Self::Torob { .. } => SourceKind::Torob,
        }
    }
}

/// Turns credentials into a ready client.
pub trait SourceBuilder: Send + Sync {
    fn build(&self, credentials: SourceCredentials) -> Box<dyn PriceSource>;
}
