use rust_decimal::Decimal;

use crate::source::{FetchOutcome, PriceQuote, SourceError, SourceKind};

#[derive(Debug)]
pub enum SourceOutcome {
    Found(PriceQuote),
    NotFound,
    Unavailable(SourceError),
    /// Stored credentials could not be decrypted; the source was not queried.
    CredentialsCorrupt,
}

impl From<FetchOutcome> for SourceOutcome {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Found(quote) => Self::Found(quote),
            FetchOutcome::NotFound => Self::NotFound,
            FetchOutcome::TransientError(e) => Self::Unavailable(e),
        }
    }
}

#[derive(Debug)]
pub struct SourceReport {
    pub source: SourceKind,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonStatus {
    /// Every configured source returned a quote.
    Complete,
    /// At least one quote, and at least one source without one.
    Partial,
    /// Every source answered that it has no match.
    NothingFound,
    /// No source answered at all.
    Unavailable,
    /// No quote, some sources had no match and others failed.
    Inconclusive,
    /// The user has no usable source configured.
    NoSources,
}

/// The reconciled answer to one product query, one report per configured source
/// in configuration order.
#[derive(Debug)]
pub struct ComparisonResult {
    pub query: String,
    pub reports: Vec<SourceReport>,
}

impl ComparisonResult {
    pub fn status(&self) -> ComparisonStatus {
        if self.reports.is_empty() {
            return ComparisonStatus::NoSources;
        }

        let found = self.quotes().count();
        let not_found = self
            .reports
            .iter()
            .filter(|r| matches!(r.outcome, SourceOutcome::NotFound))
            .count();
        let total = self.reports.len();

        match (found, not_found) {
            (f, _) if f == total => ComparisonStatus::Complete,
            (f, _) if f > 0 => ComparisonStatus::Partial,
            (_, n) if n == total => ComparisonStatus::NothingFound,
            (_, 0) => ComparisonStatus::Unavailable,
            _ => ComparisonStatus::Inconclusive,
        }
    }

    pub fn quotes(&self) -> impl Iterator<Item = &PriceQuote> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            SourceOutcome::Found(quote) => Some(quote),
            _ => None,
        })
    }

    /// Lowest priced quote. Ties keep the earlier source. Quotes in different
    /// currencies are not comparable, so none is picked.
    pub fn cheapest(&self) -> Option<&PriceQuote> {
        let mut quotes = self.quotes();
        let first = quotes.next()?;

        let mut cheapest = first;
        for quote in quotes {
            if quote.currency != first.currency {
                return None;
            }
            if quote.price < cheapest.price {
                cheapest = quote;
            }
        }

        Some(cheapest)
    }

    /// Storefront price minus the Torob price, when both are known in one currency.
    pub fn storefront_gap(&self) -> Option<Decimal> {
        let find = |kind: SourceKind| self.quotes().find(|q| q.source == kind);
        let (store, market) = (find(SourceKind::WooCommerce)?, find(SourceKind::Torob)?);

        (store.currency == market.currency).then(|| store.price - market.price)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, SourceOutcome::Unavailable(_) | SourceOutcome::CredentialsCorrupt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quote(source: SourceKind, price: i64, currency: &str) -> SourceOutcome {
        SourceOutcome::Found(PriceQuote {
            source,
            item_id: None,
            name: "Kettle".into(),
            price: Decimal::from(price),
            regular_price: None,
            currency: currency.into(),
            shop_name: None,
        })
    }

    fn result(outcomes: Vec<SourceOutcome>) -> ComparisonResult {
        let kinds = [SourceKind::WooCommerce, SourceKind::Torob];
        ComparisonResult {
            query: "kettle".into(),
            reports: outcomes
                .into_iter()
                .zip(kinds)
                .map(|(outcome, source)| SourceReport { source, outcome })
                .collect(),
        }
    }

    fn timeout() -> SourceOutcome {
        SourceOutcome::Unavailable(SourceError::Timeout(Duration::from_secs(5)))
    }

    #[test]
    fn test_statuses() {
        let cases = [
            (vec![], ComparisonStatus::NoSources),
            (
                vec![quote(SourceKind::WooCommerce, 1, "IRT"), quote(SourceKind::Torob, 2, "IRT")],
                ComparisonStatus::Complete,
            ),
            (vec![quote(SourceKind::WooCommerce, 1, "IRT"), timeout()], ComparisonStatus::Partial),
            (
                vec![quote(SourceKind::WooCommerce, 1, "IRT"), SourceOutcome::NotFound],
                ComparisonStatus::Partial,
            ),
            (vec![SourceOutcome::NotFound, SourceOutcome::NotFound], ComparisonStatus::NothingFound),
            (vec![timeout(), SourceOutcome::CredentialsCorrupt], ComparisonStatus::Unavailable),
            (vec![SourceOutcome::NotFound, timeout()], ComparisonStatus::Inconclusive),
            (vec![SourceOutcome::CredentialsCorrupt, SourceOutcome::NotFound], ComparisonStatus::Inconclusive),
        ];

        for (outcomes, expected) in cases {
            assert_eq!(result(outcomes).status(), expected);
        }
    }

    #[test]
    fn test_cheapest_picks_lowest_price() {
        let result = result(vec![
            quote(SourceKind::WooCommerce, 12000, "IRT"),
            quote(SourceKind::Torob, 9500, "IRT"),
        ]);

        let cheapest = result.cheapest().unwrap();
        assert_eq!(cheapest.source, SourceKind::Torob);
        assert_eq!(cheapest.price, Decimal::from(9500));
        assert_eq!(result.storefront_gap(), Some(Decimal::from(2500)));
    }

    #[test]
    fn test_tie_goes_to_first_source() {
        let result = result(vec![
            quote(SourceKind::WooCommerce, 9500, "IRT"),
            quote(SourceKind::Torob, 9500, "IRT"),
        ]);
        assert_eq!(result.cheapest().unwrap().source, SourceKind::WooCommerce);
    }

    #[test]
    fn test_mixed_currencies_have_no_minimum() {
        let result = result(vec![
            quote(SourceKind::WooCommerce, 12000, "IRT"),
            quote(SourceKind::Torob, 9500, "IRR"),
        ]);
        assert!(result.cheapest().is_none());
        assert!(result.storefront_gap().is_none());
        assert_eq!(result.quotes().count(), 2);
    }

    #[test]
    fn test_partial_result_flags_minimum_and_failures() {
        let result = result(vec![timeout(), quote(SourceKind::Torob, 9500, "IRT")]);

        assert_eq!(result.cheapest().unwrap().source, SourceKind::Torob);
        let failures: Vec<_> = result.failures().map(|r| r.source).collect();
        assert_eq!(failures, vec![SourceKind::WooCommerce]);
    }
}
