use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde_json::Value;

use dealscout_core::{ExtractionMethod, Rating, Retailer};

use super::{absolute_url, encode_query, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::{
    availability_from_text, clean_text, format_usd, jsonld, parse_amount, rating_from_value,
    ParsedFields, SearchHit,
};

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/ip/(?:[^/]+/)?(\d+)").expect("valid regex"));
static NEXT_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).expect("valid regex")
});

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<h1[^>]*itemprop="name"[^>]*>(.*?)</h1>"#,
        r#"(?is)<span[^>]*itemprop="price"[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<span[^>]*class="rating-number"[^>]*>\(?([\d.]+)\)?</span>"#),
        Some(r#"(?is)<button[^>]*data-automation-id="atc"[^>]*>(.*?)</button>"#),
    )
});

const ORIGIN: &str = "https://www.walmart.com";

pub struct WalmartAdapter;

impl SourceAdapter for WalmartAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::Walmart
    }

    fn domains(&self) -> &'static [&'static str] {
        &["walmart.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["Walmart.com"]
    }

    fn item_id(&self, url: &Url) -> Option<String> {
        ITEM_ID_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// JSON-LD when present, then the embedded page state, then markup.
    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        let mut fields = jsonld::extract_product(html).unwrap_or_default();
        if let Some(product) = next_data(html)
            .as_ref()
            .and_then(|data| data.pointer("/props/pageProps/initialData/data/product"))
        {
            fields.fill_from(item_fields(product));
        }
        if fields.is_usable() {
            return Ok(fields);
        }
        let mut from_markup = structured_parse(url, html, &PRODUCT_MARKUP)?;
        from_markup.fill_from(fields);
        Ok(from_markup)
    }

    fn search_url(&self, query: &str) -> String {
        format!("{ORIGIN}/search?q={}", encode_query(query))
    }

    fn parse_search_results(&self, html: &str) -> Vec<SearchHit> {
        let Some(data) = next_data(html) else {
            return jsonld_hits(html);
        };
        let Some(stacks) = data
            .pointer("/props/pageProps/initialData/searchResult/itemStacks")
            .and_then(Value::as_array)
        else {
            return jsonld_hits(html);
        };

        stacks
            .iter()
            .filter_map(|stack| stack.get("items").and_then(Value::as_array))
            .flatten()
            .filter(|item| item.get("__typename").and_then(Value::as_str) != Some("AdPlaceholder"))
            .map(item_fields)
            .filter(|fields| fields.title.is_some() && fields.url.is_some())
            .map(|fields| SearchHit {
                fields,
                method: ExtractionMethod::Structured,
            })
            .collect()
    }
}

fn jsonld_hits(html: &str) -> Vec<SearchHit> {
    jsonld::extract_products(html)
        .into_iter()
        .filter(|fields| fields.url.is_some() && fields.title.is_some())
        .map(|fields| SearchHit {
            fields,
            method: ExtractionMethod::Structured,
        })
        .collect()
}

fn next_data(html: &str) -> Option<Value> {
    let raw = NEXT_DATA_RE.captures(html)?.get(1)?.as_str();
    serde_json::from_str(raw.trim()).ok()
}

/// Maps a Walmart product object (page state or search item) to fields.
fn item_fields(item: &Value) -> ParsedFields {
    let title = item
        .get("name")
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|t| !t.is_empty());

    let price = item
        .pointer("/priceInfo/currentPrice/price")
        .or_else(|| item.get("price"))
        .and_then(|v| match v {
            Value::Number(n) => parse_amount(&n.to_string()),
            Value::String(s) => parse_amount(s.trim_start_matches('$')),
            _ => None,
        });

    let reviews = item.get("numberOfReviews").and_then(Value::as_u64);
    let rating = match (item.get("averageRating").and_then(Value::as_f64), reviews) {
        (_, Some(0)) => Some(Rating::NoRatings),
        (Some(value), _) => Some(rating_from_value(value, None)),
        (None, _) => None,
    };

    let availability = item
        .pointer("/availabilityStatusV2/value")
        .or_else(|| item.get("availabilityStatus"))
        .and_then(Value::as_str)
        .and_then(availability_from_text);

    let item_id = item
        .get("usItemId")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let url = item
        .get("canonicalUrl")
        .and_then(Value::as_str)
        .map(|href| absolute_url(ORIGIN, href));

    ParsedFields {
        title,
        price,
        price_text: price.map(format_usd),
        rating,
        availability,
        item_id,
        url,
    }
}
