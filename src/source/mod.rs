//! External price sources.
//!
//! Each source answers one product query with a tri-state [`FetchOutcome`]. The
//! aggregator only ever sees `dyn PriceSource`; which concrete client backs a
//! source is decided by the [`SourceBuilder`] from the user's credentials.

mod error;
mod model;
pub mod torob;
pub mod traits;
pub mod woocommerce;

pub use error::SourceError;
pub use model::*;
pub use torob::TorobSource;
pub use traits::{PriceSource, SourceBuilder, SourceCredentials};
pub use woocommerce::WooCommerceSource;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::{config::SourceConfig, utils::http::create_source_client};

/// Builds the real HTTP clients. One connection pool is shared by every source.
#[derive(Clone)]
pub struct HttpSourceBuilder {
    client: Client,
    torob_base_url: String,
    currency: String,
}

impl HttpSourceBuilder {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: create_source_client(config.timeout)?,
            torob_base_url: config.torob_base_url.trim_end_matches('/').to_string(),
            currency: config.currency.clone(),
        })
    }
}

impl SourceBuilder for HttpSourceBuilder {
    fn build(&self, credentials: SourceCredentials) -> Box<dyn PriceSource> {
        match credentials {
            SourceCredentials::WooCommerce {
                store_url,
                consumer_key,
                consumer_secret,
            } => Box::new(WooCommerceSource::new(
                self.client.clone(),
                store_url,
                consumer_key,
                consumer_secret,
                self.currency.clone(),
            )),
            SourceCredentials::Torob { token } => Box::new(TorobSource::new(
                self.client.clone(),
                self.torob_base_url.clone(),
                token,
                self.currency.clone(),
            )),
        }
    }
}

/// Sends the request and decodes a JSON body, mapping each failure to its
/// `SourceError` variant.
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SourceError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::from_status(status));
    }

    let body = response.bytes().await?;
    serde_json::from_slice::<T>(&body).map_err(|e| SourceError::Malformed(e.to_string()))
}
