//! Last-resort product records derived from the URL alone.

use dealscout_core::{Availability, Retailer};

use crate::parse::ParsedFields;

pub(crate) const SYNTHETIC_PRICE_TEXT: &str =
    "Price unavailable: page could not be fetched or parsed; record derived from URL";

/// Builds fields from a URL slug or retailer item id. Returns `None` when
/// the URL carries neither.
pub(crate) fn from_url(
    retailer: Retailer,
    slug: Option<&str>,
    item_id: Option<&str>,
) -> Option<ParsedFields> {
    let title = slug
        .map(title_from_slug)
        .filter(|t| !t.is_empty())
        .or_else(|| item_id.map(|id| format!("{retailer} item {id}")))?;

    Some(ParsedFields {
        title: Some(title),
        price: None,
        price_text: Some(SYNTHETIC_PRICE_TEXT.to_string()),
        rating: None,
        availability: Some(Availability::Unknown),
        item_id: item_id.map(str::to_string),
        url: None,
    })
}

/// `"ninja-air-fryer_4qt"` becomes `"Ninja Air Fryer 4qt"`.
fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_', '+'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
