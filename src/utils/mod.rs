pub mod http;

use regex::Regex;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use url::Url;

static WOO_CONSUMER_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ck_[A-Za-z0-9]{16,64}$").expect("valid consumer key regex"));

static WOO_CONSUMER_SECRET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cs_[A-Za-z0-9]{16,64}$").expect("valid consumer secret regex"));

static TOROB_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._\-]{16,512}$").expect("valid token regex"));

/// Short, stable identifier for a secret so it can appear in logs.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// Formats an amount with thousands separators, e.g. `1250000` as `1,250,000`.
pub fn format_amount(amount: &Decimal) -> String {
    let normalized = amount.normalize().to_string();
    let (sign, unsigned) = match normalized.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", normalized.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

pub fn seconds_to_human_readable(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;

    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Accepts an http(s) storefront URL with a host and returns it without a trailing slash.
pub fn parse_store_url(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    if url.query().is_some() || url.fragment().is_some() {
        return None;
    }

    Some(url.as_str().trim_end_matches('/').to_string())
}

pub fn validate_consumer_key(key: &str) -> bool {
    WOO_CONSUMER_KEY_REGEX.is_match(key)
}

pub fn validate_consumer_secret(secret: &str) -> bool {
    WOO_CONSUMER_SECRET_REGEX.is_match(secret)
}

pub fn validate_torob_token(token: &str) -> bool {
    TOROB_TOKEN_REGEX.is_match(token)
}
