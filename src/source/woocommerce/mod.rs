mod model;

use async_trait::async_trait;
use reqwest::Client;

use model::WooProduct;

use super::{get_json, FetchOutcome, PriceQuote, PriceSource, SourceError, SourceKind};

/// The user's own storefront, read through the WooCommerce REST API.
pub struct WooCommerceSource {
    client: Client,
    store_url: String,
    consumer_key: String,
    consumer_secret: String,
    currency: String,
}

impl WooCommerceSource {
    pub fn new(
        client: Client,
        store_url: String,
        consumer_key: String,
        consumer_secret: String,
        currency: String,
    ) -> Self {
        Self {
            client,
            store_url: store_url.trim_end_matches('/').to_string(),
            consumer_key,
            consumer_secret,
            currency,
        }
    }

    async fn search(&self, query: &str) -> Result<Option<PriceQuote>, SourceError> {
        let url = format!("{}/wp-json/wc/v3/products", self.store_url);
        let request = self
            .client
            .get(&url)
            .query(&[("search", query), ("per_page", "1")])
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret));

        let products: Vec<WooProduct> = get_json(request).await?;
        let Some(product) = products.into_iter().next() else {
            return Ok(None);
        };

        Ok(Some(PriceQuote {
            source: SourceKind::WooCommerce,
            item_id: Some(product.id.to_string()),
            price: product.price()?,
            regular_price: product.regular_price()?,
            name: product.name,
            currency: self.currency.clone(),
            shop_name: None,
        }))
    }
}

#[async_trait]
impl PriceSource for WooCommerceSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WooCommerce
    }

    async fn fetch_price(&self, query: &str) -> FetchOutcome {
        debug!("Searching WooCommerce store {} for {:?}", self.store_url, query);
        self.search(query).await.into()
    }
}
