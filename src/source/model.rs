use rust_decimal::Decimal;
use std::fmt::{self, Display};

use super::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    WooCommerce,
    Torob,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WooCommerce => "woocommerce",
            Self::Torob => "torob",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WooCommerce => write!(f, "WooCommerce"),
            Self::Torob => write!(f, "Torob"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub source: SourceKind,
    pub item_id: Option<String>,
    pub name: String,
    pub price: Decimal,
    /// Price before any sale, when the source reports one.
    pub regular_price: Option<Decimal>,
    pub currency: String,
    pub shop_name: Option<String>,
}

#[derive(Debug)]
pub enum FetchOutcome {
    Found(PriceQuote),
    NotFound,
    TransientError(SourceError),
}

impl From<Result<Option<PriceQuote>, SourceError>> for FetchOutcome {
    fn from(result: Result<Option<PriceQuote>, SourceError>) -> Self {
        match result {
            Ok(Some(quote)) => Self::Found(quote),
            Ok(None) => Self::NotFound,
            Err(e) => Self::TransientError(e),
        }
    }
}
