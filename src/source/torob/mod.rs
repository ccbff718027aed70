mod model;

use async_trait::async_trait;
use reqwest::Client;

use model::TorobSearchResponse;

use super::{get_json, FetchOutcome, PriceQuote, PriceSource, SourceError, SourceKind};

/// The Torob price aggregator, queried with the user's bearer token.
pub struct TorobSource {
    client: Client,
    base_url: String,
    token: String,
    currency: String,
}

impl TorobSource {
    pub fn new(client: Client, base_url: String, token: String, currency: String) -> Self {
        Self {
            client,
            base_url,
            token,
            currency,
        }
    }

    async fn search(&self, query: &str) -> Result<Option<PriceQuote>, SourceError> {
        let request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)])
            .bearer_auth(&self.token);

        let response: TorobSearchResponse = get_json(request).await?;
        let Some(product) = response
            .into_first_product()
            .map_err(|e| SourceError::Malformed(e.to_string()))?
        else {
            return Ok(None);
        };

        Ok(Some(PriceQuote {
            source: SourceKind::Torob,
            item_id: None,
            name: product.name,
            price: product.price,
            regular_price: None,
            currency: self.currency.clone(),
            shop_name: product.shop_name,
        }))
    }
}

#[async_trait]
impl PriceSource for TorobSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Torob
    }

    async fn fetch_price(&self, query: &str) -> FetchOutcome {
        debug!("Searching Torob for {:?}", query);
        self.search(query).await.into()
    }
}
