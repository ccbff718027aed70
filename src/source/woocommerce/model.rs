use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::source::SourceError;

/// The subset of a `wc/v3` product the bot reads. Prices arrive as strings and
/// are empty when unset.
#[derive(Debug, Deserialize)]
pub struct WooProduct {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
}

impl WooProduct {
    pub fn price(&self) -> Result<Decimal, SourceError> {
        parse_price(&self.price)?.ok_or_else(|| SourceError::Malformed(format!("product {} has no price", self.id)))
    }

    pub fn regular_price(&self) -> Result<Option<Decimal>, SourceError> {
        parse_price(&self.regular_price)
    }
}

fn parse_price(raw: &str) -> Result<Option<Decimal>, SourceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    Decimal::from_str(raw)
        .map(Some)
        .map_err(|e| SourceError::Malformed(format!("price {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: &str, regular_price: &str) -> WooProduct {
        WooProduct {
            id: 7,
            name: "Kettle".into(),
            price: price.into(),
            regular_price: regular_price.into(),
        }
    }

    #[test]
    fn test_prices_parsed() {
        let p = product("12000", "15000.50");
        assert_eq!(p.price().unwrap(), Decimal::from(12000));
        assert_eq!(p.regular_price().unwrap(), Some(Decimal::from_str("15000.50").unwrap()));
    }

    #[test]
    fn test_empty_regular_price_is_none() {
        assert_eq!(product("12000", "").regular_price().unwrap(), None);
    }

    #[test]
    fn test_unusable_price_is_malformed() {
        assert!(matches!(product("", "").price(), Err(SourceError::Malformed(_))));
        assert!(matches!(product("twelve", "").price(), Err(SourceError::Malformed(_))));
    }
}
