use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::{
    service::{
        aggregator::{ComparisonResult, ComparisonStatus, SourceOutcome},
        TierCatalog,
    },
    utils::format_amount,
};

use super::{Button, Keyboard, MenuAction};

pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new(t!("buttons.api_settings"), MenuAction::ApiSettings),
        Button::new(t!("buttons.search_product"), MenuAction::SearchProduct),
        Button::new(t!("buttons.advanced_settings"), MenuAction::AdvancedSettings),
    ])
}

pub fn api_settings_keyboard() -> Keyboard {
    Keyboard::column([
        Button::new(t!("buttons.set_woo_api"), MenuAction::SetWooApi),
        Button::new(t!("buttons.set_torob_api"), MenuAction::SetTorobApi),
        back_keyboard_button(),
    ])
}

pub fn back_keyboard() -> Keyboard {
    Keyboard::column([back_keyboard_button()])
}

fn back_keyboard_button() -> Button {
    Button::new(t!("buttons.main_menu"), MenuAction::MainMenu)
}

pub fn expiry(ends_at: Option<DateTime<Utc>>) -> String {
    match ends_at {
        Some(at) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => t!("status.never_expires").to_string(),
    }
}

pub fn plans(catalog: &TierCatalog, currency: &str) -> String {
    let mut lines = vec![t!("license.plans_header").to_string()];
    lines.extend(catalog.plans().iter().filter(|plan| plan.tier.is_paid()).map(|plan| {
        t!(
            "license.plan_line",
            tier = plan.tier.as_str(),
            price = format_amount(&plan.price),
            currency = currency
        )
        .to_string()
    }));
    lines.join("\n")
}

pub fn comparison(result: &ComparisonResult) -> String {
    let cheapest = result.cheapest().map(|quote| quote.source);
    let mut lines = vec![t!("results.header", query = result.query.as_str()).to_string()];

    for report in &result.reports {
        let source = report.source.to_string();
        match &report.outcome {
            SourceOutcome::Found(quote) => {
                lines.push(
                    t!(
                        "results.found",
                        source = source,
                        name = quote.name.as_str(),
                        price = format_amount(&quote.price),
                        currency = quote.currency.as_str()
                    )
                    .to_string(),
                );
                if let Some(regular) = quote.regular_price.filter(|regular| *regular != quote.price) {
                    lines.push(
                        t!(
                            "results.regular_price",
                            price = format_amount(&regular),
                            currency = quote.currency.as_str()
                        )
                        .to_string(),
                    );
                }
                if let Some(shop) = &quote.shop_name {
                    lines.push(t!("results.shop", shop = shop.as_str()).to_string());
                }
                // With a single source there is nothing to be lowest against.
                if cheapest == Some(report.source) && result.reports.len() > 1 {
                    lines.push(t!("results.lowest").to_string());
                }
            }
            SourceOutcome::NotFound => lines.push(t!("results.not_found", source = source).to_string()),
            SourceOutcome::Unavailable(_) => lines.push(t!("results.unavailable", source = source).to_string()),
            SourceOutcome::CredentialsCorrupt => {
                lines.push(t!("results.credentials_corrupt", source = source).to_string())
            }
        }
    }

    if let Some(gap) = result.storefront_gap() {
        let currency = result.quotes().next().map(|q| q.currency.as_str()).unwrap_or_default();
        lines.push(String::new());
        lines.push(gap_line(gap, currency));
    }

    let footer = match result.status() {
        ComparisonStatus::Complete | ComparisonStatus::NoSources => None,
        ComparisonStatus::Partial => Some(t!("results.partial")),
        ComparisonStatus::NothingFound => Some(t!("results.nothing_found")),
        ComparisonStatus::Unavailable => Some(t!("results.unavailable_all")),
        ComparisonStatus::Inconclusive => Some(t!("results.inconclusive")),
    };
    if let Some(footer) = footer {
        lines.push(String::new());
        lines.push(footer.to_string());
    }

    lines.join("\n")
}

fn gap_line(gap: Decimal, currency: &str) -> String {
    match gap.cmp(&Decimal::ZERO) {
        Ordering::Greater => t!("results.gap_higher", amount = format_amount(&gap), currency = currency),
        Ordering::Less => t!("results.gap_lower", amount = format_amount(&gap.abs()), currency = currency),
        Ordering::Equal => t!("results.gap_equal"),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        service::aggregator::SourceReport,
        source::{PriceQuote, SourceError, SourceKind},
    };

    fn found(source: SourceKind, price: i64, shop: Option<&str>) -> SourceReport {
        SourceReport {
            source,
            outcome: SourceOutcome::Found(PriceQuote {
                source,
                item_id: None,
                name: "Steel Kettle".into(),
                price: Decimal::from(price),
                regular_price: None,
                currency: "IRT".into(),
                shop_name: shop.map(Into::into),
            }),
        }
    }

    #[test]
    fn test_complete_comparison() {
        let text = comparison(&ComparisonResult {
            query: "kettle".into(),
            reports: vec![
                found(SourceKind::WooCommerce, 12000, None),
                found(SourceKind::Torob, 9500, Some("Digikala")),
            ],
        });

        assert!(text.contains("kettle"));
        assert!(text.contains("12,000 IRT"));
        assert!(text.contains("9,500 IRT"));
        assert!(text.contains("Digikala"));
        assert!(text.contains("2,500 IRT more expensive"));

        // The lowest marker follows the Torob line.
        let torob_at = text.find("9,500").unwrap();
        let marker_at = text.find("Lowest price").unwrap();
        assert!(marker_at > torob_at);
    }

    #[test]
    fn test_partial_comparison_marks_missing_source() {
        let text = comparison(&ComparisonResult {
            query: "kettle".into(),
            reports: vec![
                SourceReport {
                    source: SourceKind::WooCommerce,
                    outcome: SourceOutcome::Unavailable(SourceError::Timeout(Duration::from_secs(5))),
                },
                found(SourceKind::Torob, 9500, None),
            ],
        });

        assert!(text.contains("WooCommerce: temporarily unavailable"));
        assert!(text.contains("Some sources did not return a price"));
        // The only successful quote is still the flagged minimum.
        let torob_at = text.find("9,500").unwrap();
        assert!(text.find("Lowest price").unwrap() > torob_at);
    }

    #[test]
    fn test_single_source_has_no_lowest_marker() {
        let text = comparison(&ComparisonResult {
            query: "kettle".into(),
            reports: vec![found(SourceKind::WooCommerce, 12000, None)],
        });

        assert!(text.contains("12,000"));
        assert!(!text.contains("Lowest price"));
    }

    #[test]
    fn test_nothing_found() {
        let text = comparison(&ComparisonResult {
            query: "unicorn".into(),
            reports: vec![
                SourceReport {
                    source: SourceKind::WooCommerce,
                    outcome: SourceOutcome::NotFound,
                },
                SourceReport {
                    source: SourceKind::Torob,
                    outcome: SourceOutcome::CredentialsCorrupt,
                },
            ],
        });

        assert!(text.contains("WooCommerce: not available at this source"));
        assert!(text.contains("Torob: credentials need to be re-entered"));
        assert!(text.contains("some sources could not be reached"));
    }

    #[test]
    fn test_expiry() {
        assert_eq!(expiry(None), "no expiry");
        let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(expiry(Some(at)), "2026-05-01 08:30 UTC");
    }
}
