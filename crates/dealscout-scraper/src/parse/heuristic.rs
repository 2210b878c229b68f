//! Retailer-agnostic pattern extraction, used when structured markup is
//! missing or incomplete.

use std::sync::LazyLock;

use regex::Regex;

use dealscout_core::{Availability, Rating};

use super::{
    availability_from_text, clean_text, format_usd, parse_amount, parse_price_text, ParsedFields,
};

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]+property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']+)["']"#)
        .expect("valid regex")
});
static TITLE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("valid regex"));
static ITEMPROP_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)itemprop\s*=\s*["']price["'][^>]*content\s*=\s*["']([\d.,]+)["']"#)
        .expect("valid regex")
});
static META_PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<meta[^>]+property\s*=\s*["'](?:product|og):price:amount["']"#,
        r#"[^>]*content\s*=\s*["']([\d.,]+)["']"#,
    ))
    .expect("valid regex")
});
static PRICE_HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(see price in cart|add to cart to see price|",
        r"price not available|see low price in cart)",
    ))
    .expect("valid regex")
});
static STARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:rated\s+)?([0-5](?:\.\d{1,2})?)\s+out\s+of\s+5(?:\s+stars?)?")
        .expect("valid regex")
});
static NO_RATINGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(no ratings yet|not yet reviewed|",
        r"be the first to (?:review|write a review)|no reviews yet)",
    ))
    .expect("valid regex")
});
static STOCK_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(out of stock|sold out|currently unavailable|no longer available|",
        r"in stock|add to cart|ship it|buy it now)",
    ))
    .expect("valid regex")
});

/// Best-effort extraction from raw HTML text.
///
/// `boilerplate` lists storefront names to strip from `<title>` suffixes
/// (e.g. `"Best Buy"` for `"... - Best Buy"`).
pub(crate) fn extract(html: &str, boilerplate: &[&str]) -> ParsedFields {
    let title = OG_TITLE_RE
        .captures(html)
        .or_else(|| TITLE_TAG_RE.captures(html))
        .or_else(|| H1_RE.captures(html))
        .and_then(|c| c.get(1))
        .map(|m| strip_boilerplate(&clean_text(m.as_str()), boilerplate))
        .filter(|t| !t.is_empty());

    let (price, price_text) = extract_price(html);

    let rating = if let Some(caps) = STARS_RE.captures(html) {
        caps.get(1)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map(Rating::stars)
    } else if NO_RATINGS_RE.is_match(html) {
        Some(Rating::NoRatings)
    } else {
        None
    };

    let availability = extract_availability(html);

    ParsedFields {
        title,
        price,
        price_text,
        rating,
        availability,
        item_id: None,
        url: None,
    }
}

fn extract_price(html: &str) -> (Option<rust_decimal::Decimal>, Option<String>) {
    let tagged = ITEMPROP_PRICE_RE
        .captures(html)
        .or_else(|| META_PRICE_RE.captures(html))
        .and_then(|c| c.get(1))
        .and_then(|m| parse_amount(m.as_str()));
    if let Some(amount) = tagged {
        return (Some(amount), Some(format_usd(amount)));
    }

    if let Some(caps) = PRICE_HIDDEN_RE.captures(html) {
        let phrase = caps.get(1).map_or("price hidden", |m| m.as_str());
        return (None, Some(format!("Price unavailable: retailer shows \"{phrase}\"")));
    }

    let text = clean_text(html);
    match parse_price_text(&text) {
        Some(amount) => (Some(amount), Some(format_usd(amount))),
        None => (None, None),
    }
}

/// Stock phrases are scanned in document order; the first one wins, except
/// that an explicit out-of-stock phrase anywhere beats a generic "add to cart".
fn extract_availability(html: &str) -> Option<Availability> {
    let text = clean_text(html);
    let mut found = None;
    for caps in STOCK_PHRASE_RE.captures_iter(&text) {
        let phrase = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
        match availability_from_text(&phrase) {
            Some(Availability::OutOfStock) => return Some(Availability::OutOfStock),
            Some(Availability::InStock | Availability::Unknown) | None => {
                found = found.or(Some(Availability::InStock));
            }
        }
    }
    found
}

const TITLE_SEPARATORS: [char; 5] = [':', '-', '|', '–', ' '];

/// Removes storefront names attached with a separator, either as a suffix
/// (`" : Amazon.com: Electronics"`, `" - Best Buy"`) or as a prefix
/// (`"Amazon.com: "`). Names embedded in a word are left alone.
pub(crate) fn strip_boilerplate(title: &str, boilerplate: &[&str]) -> String {
    let mut cleaned = title.trim().to_string();
    for name in boilerplate {
        let needle = name.to_ascii_lowercase();
        let lowered = cleaned.to_ascii_lowercase();

        if let Some(rest) = lowered.strip_prefix(&needle) {
            let rest = rest.trim_start();
            if rest.starts_with([':', '-', '|', '–']) {
                let offset = cleaned.len() - rest.len();
                cleaned = cleaned[offset..]
                    .trim_start_matches(TITLE_SEPARATORS)
                    .to_string();
                continue;
            }
        }

        let suffix_at = [" : ", " - ", " | ", " – ", ": "]
            .iter()
            .filter_map(|sep| lowered.find(&format!("{sep}{needle}")))
            .filter(|pos| *pos > 0)
            .min();
        if let Some(pos) = suffix_at {
            cleaned.truncate(pos);
        }
    }
    cleaned.trim().to_string()
}
