use rust_decimal::Decimal;
use serde::Deserialize;

/// Hits stay raw until picked so a broken tail entry cannot spoil the first one.
#[derive(Debug, Deserialize)]
pub struct TorobSearchResponse {
    #[serde(default)]
    pub results: Option<Vec<serde_json::Value>>,
}

impl TorobSearchResponse {
    pub fn into_first_product(self) -> Result<Option<TorobProduct>, serde_json::Error> {
        match self.results.unwrap_or_default().into_iter().next() {
            Some(hit) => serde_json::from_value(hit).map(Some),
            None => Ok(None),
        }
    }
}

/// One search hit. `price` is the lowest offer across the shops listing it.
#[derive(Debug, Deserialize)]
pub struct TorobProduct {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub shop_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_as_number_or_string() {
        let product: TorobProduct =
            serde_json::from_value(json!({ "name": "A", "price": 9500, "shop_name": "Digi" })).unwrap();
        assert_eq!(product.price, Decimal::from(9500));
        assert_eq!(product.shop_name.as_deref(), Some("Digi"));

        let product: TorobProduct = serde_json::from_value(json!({ "name": "B", "price": "9600" })).unwrap();
        assert_eq!(product.price, Decimal::from(9600));
        assert_eq!(product.shop_name, None);
    }

    #[test]
    fn test_only_first_hit_is_decoded() {
        let response: TorobSearchResponse = serde_json::from_value(json!({
            "results": [
                { "name": "A", "price": 9500 },
                { "name": "B", "price": null },
                { "price": "n/a" }
            ]
        }))
        .unwrap();

        let product = response.into_first_product().unwrap().unwrap();
        assert_eq!(product.name, "A");
    }

    #[test]
    fn test_broken_first_hit_is_an_error() {
        let response: TorobSearchResponse =
            serde_json::from_value(json!({ "results": [{ "name": "A", "price": null }] })).unwrap();
        assert!(response.into_first_product().is_err());
    }

    #[test]
    fn test_missing_results() {
        let response: TorobSearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_first_product().unwrap().is_none());
    }
}
