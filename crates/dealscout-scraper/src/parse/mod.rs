//! Field extraction from raw retailer HTML.
//!
//! Every parser returns a [`ParsedFields`] with whatever it could find; the
//! extraction pipeline decides whether that is enough for a tier to count as
//! a success.

pub(crate) mod heuristic;
pub(crate) mod jsonld;
pub(crate) mod markup;

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use dealscout_core::{Availability, ExtractionMethod, Rating};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DOLLAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)").expect("valid regex")
});
static BARE_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*$").expect("valid regex")
});

/// Partial field set produced by one parser pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFields {
    pub title: Option<String>,
    /// Price normalized to USD.
    pub price: Option<Decimal>,
    /// Raw display text for the price, or an explanation when `price` is
    /// absent (e.g. "See price in cart").
    pub price_text: Option<String>,
    pub rating: Option<Rating>,
    pub availability: Option<Availability>,
    pub item_id: Option<String>,
    /// Product URL; only set for search-result hits.
    pub url: Option<String>,
}

impl ParsedFields {
    /// A usable field set has a title plus at least one deal signal.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_signal = self.price.is_some()
            || self.price_text.is_some()
            || self.rating.is_some()
            || self.availability.is_some();
        has_title && has_signal
    }

    /// Fills fields that are still missing from `other`. Fields already
    /// present are kept.
    pub fn fill_from(&mut self, other: ParsedFields) {
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.price.is_none() && other.price.is_some() {
            self.price = other.price;
            self.price_text = other.price_text;
        } else if self.price_text.is_none() {
            self.price_text = other.price_text;
        }
        if self.rating.is_none() {
            self.rating = other.rating;
        }
        if self.availability.is_none() {
            self.availability = other.availability;
        }
        if self.item_id.is_none() {
            self.item_id = other.item_id;
        }
        if self.url.is_none() {
            self.url = other.url;
        }
    }

    /// Human-readable list of what is missing, for structural-failure messages.
    #[must_use]
    pub fn missing_summary(&self) -> String {
        let mut missing = Vec::new();
        if self.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            missing.push("title");
        }
        if self.price.is_none() && self.price_text.is_none() {
            missing.push("price");
        }
        if self.rating.is_none() {
            missing.push("rating");
        }
        if self.availability.is_none() {
            missing.push("availability");
        }
        if missing.is_empty() {
            "no fields missing".to_string()
        } else {
            format!("missing {}", missing.join(", "))
        }
    }
}

/// One product found on a retailer's search page.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub fields: ParsedFields,
    /// Structured when the hit came from JSON-LD or embedded data,
    /// heuristic when it came from markup patterns.
    pub method: ExtractionMethod,
}

/// Strips tags, decodes common entities, and collapses whitespace.
#[must_use]
pub(crate) fn clean_text(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, " ");
    let decoded = decode_html(&without_tags);
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}

pub(crate) fn decode_html(value: &str) -> String {
    value
        .replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Parses the first dollar amount in `text`, e.g. `"$1,299.99"` or
/// `"Now $49.99 (was $59.99)"`.
#[must_use]
pub fn parse_price_text(text: &str) -> Option<Decimal> {
    let caps = DOLLAR_RE.captures(text)?;
    parse_amount(caps.get(1)?.as_str())
}

/// Parses a bare numeric amount such as `"49.99"` or `"1,299"`.
#[must_use]
pub(crate) fn parse_amount(raw: &str) -> Option<Decimal> {
    let caps = BARE_AMOUNT_RE.captures(raw)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    let value = Decimal::from_str(&digits).ok()?;
    (value > Decimal::ZERO).then_some(value.round_dp(2))
}

/// Formats a USD amount for display, e.g. `$49.99`.
#[must_use]
pub fn format_usd(value: Decimal) -> String {
    format!("${:.2}", value.round_dp(2))
}

/// Maps schema.org availability URLs and common storefront phrases.
#[must_use]
pub(crate) fn availability_from_text(raw: &str) -> Option<Availability> {
    let lowered = raw.to_ascii_lowercase();
    let out_markers = [
        "outofstock",
        "out of stock",
        "out_of_stock",
        "soldout",
        "sold out",
        "sold_out",
        "currently unavailable",
        "discontinued",
        "no longer available",
        "not available",
    ];
    let in_markers = [
        "instock",
        "in stock",
        "in_stock",
        "limitedavailability",
        "onlineonly",
        "add to cart",
        "add_to_cart",
        "available",
    ];
    if out_markers.iter().any(|m| lowered.contains(m)) {
        return Some(Availability::OutOfStock);
    }
    if in_markers.iter().any(|m| lowered.contains(m)) {
        return Some(Availability::InStock);
    }
    None
}

/// Parses a rating value, rescaling from `best` to a 5-star scale when the
/// page uses a different maximum.
#[must_use]
pub(crate) fn rating_from_value(value: f64, best: Option<f64>) -> Rating {
    match best {
        Some(best) if best > 0.0 && (best - 5.0).abs() > f64::EPSILON => {
            Rating::stars(value * 5.0 / best)
        }
        _ => Rating::stars(value),
    }
}
