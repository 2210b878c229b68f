//! schema.org `Product` extraction from JSON-LD blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use dealscout_core::Rating;

use super::{
    availability_from_text, clean_text, format_usd, parse_amount, rating_from_value, ParsedFields,
};

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Extract every `Product` described in `<script type="application/ld+json">`
/// blocks, including products nested in `@graph` containers and `ItemList`
/// elements.
pub(crate) fn extract_products(html: &str) -> Vec<ParsedFields> {
    let mut results = Vec::new();

    for cap in SCRIPT_RE.captures_iter(html) {
        let Some(json_text) = cap.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(json_text.trim()) else {
            continue;
        };

        let mut stack = vec![value];
        while let Some(node) = stack.pop() {
            match node {
                Value::Array(items) => stack.extend(items.into_iter().rev()),
                Value::Object(_) => {
                    if let Some(graph) = node.get("@graph").and_then(Value::as_array) {
                        stack.extend(graph.iter().rev().cloned());
                    }
                    if has_type(&node, "ItemList") {
                        if let Some(elements) =
                            node.get("itemListElement").and_then(Value::as_array)
                        {
                            for element in elements.iter().rev() {
                                let item = element.get("item").unwrap_or(element);
                                stack.push(item.clone());
                            }
                        }
                    }
                    if let Some(fields) = product_fields(&node) {
                        results.push(fields);
                    }
                }
                _ => {}
            }
        }
    }

    results
}

/// First JSON-LD product on the page, if any.
pub(crate) fn extract_product(html: &str) -> Option<ParsedFields> {
    extract_products(html).into_iter().next()
}

/// `@type` may be a plain string OR an array of strings.
fn has_type(item: &Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(s)) => s.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

fn product_fields(item: &Value) -> Option<ParsedFields> {
    if !has_type(item, "Product") {
        return None;
    }

    let title = item
        .get("name")
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|t| !t.is_empty());

    let offer = item.get("offers").map(|offers| match offers {
        Value::Array(list) => list.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    });
    let (price, price_text) = offer
        .as_ref()
        .map(offer_price)
        .unwrap_or((None, None));
    let availability = offer
        .as_ref()
        .and_then(|o| o.get("availability"))
        .and_then(Value::as_str)
        .and_then(availability_from_text);

    let rating = item.get("aggregateRating").and_then(|agg| {
        let count = number(agg.get("reviewCount")).or_else(|| number(agg.get("ratingCount")));
        if count.is_some_and(|c| c <= 0.0) {
            return Some(Rating::NoRatings);
        }
        let value = number(agg.get("ratingValue"))?;
        Some(rating_from_value(value, number(agg.get("bestRating"))))
    });

    let item_id = ["sku", "productID", "mpn", "gtin13", "gtin12"]
        .iter()
        .find_map(|key| match item.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        });

    let url = item
        .get("url")
        .and_then(Value::as_str)
        .or_else(|| offer.as_ref().and_then(|o| o.get("url")).and_then(Value::as_str))
        .map(str::to_string);

    Some(ParsedFields {
        title,
        price,
        price_text,
        rating,
        availability,
        item_id,
        url,
    })
}

/// Reads `price` (or `lowPrice` on an `AggregateOffer`). Prices in a
/// currency other than USD are reported in `price_text` but not normalized.
fn offer_price(offer: &Value) -> (Option<rust_decimal::Decimal>, Option<String>) {
    let raw = offer
        .get("price")
        .or_else(|| offer.get("lowPrice"))
        .or_else(|| offer.get("priceSpecification").and_then(|s| s.get("price")));
    let amount = match raw {
        Some(Value::String(s)) => parse_amount(s),
        Some(Value::Number(n)) => parse_amount(&n.to_string()),
        _ => None,
    };
    let Some(amount) = amount else {
        return (None, None);
    };

    let currency = offer
        .get("priceCurrency")
        .and_then(Value::as_str)
        .unwrap_or("USD");
    if currency.eq_ignore_ascii_case("USD") {
        (Some(amount), Some(format_usd(amount)))
    } else {
        (
            None,
            Some(format!(
                "Listed as {amount} {currency}; not normalized to USD"
            )),
        )
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
