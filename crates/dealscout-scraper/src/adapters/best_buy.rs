use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use dealscout_core::{ExtractionMethod, Retailer};

use super::{absolute_url, encode_query, split_blocks, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::{jsonld, ParsedFields, SearchHit};

static SKU_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|&)skuId=(\d+)").expect("valid regex"));
static SKU_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{7})\.p").expect("valid regex"));
static SLUG_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/site/([^/]+)/\d+\.p").expect("valid regex"));
static RESULT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<li[^>]*class="sku-item"[^>]*data-sku-id="(\d+)""#).expect("valid regex")
});
static RESULT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<h4[^>]*class="sku-title"[^>]*>\s*<a[^>]*href="([^"]+)""#)
        .expect("valid regex")
});

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<div[^>]*class="sku-title"[^>]*>\s*<h1[^>]*>(.*?)</h1>"#,
        r#"(?is)<div[^>]*class="priceView-hero-price priceView-customer-price"[^>]*>\s*<span[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<span[^>]*class="ugc-c-review-average[^"]*"[^>]*>(.*?)</span>"#),
        Some(r#"(?is)<button[^>]*data-button-state="([^"]+)""#),
    )
});
static RESULT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<h4[^>]*class="sku-title"[^>]*>(.*?)</h4>"#,
        r#"(?is)priceView-customer-price[^>]*>\s*<span[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<p[^>]*class="visually-hidden"[^>]*>Rating\s+([\d.]+)\s+out of 5"#),
        Some(r#"(?is)<button[^>]*data-button-state="([^"]+)""#),
    )
});

const ORIGIN: &str = "https://www.bestbuy.com";

pub struct BestBuyAdapter;

impl SourceAdapter for BestBuyAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::BestBuy
    }

    fn domains(&self) -> &'static [&'static str] {
        &["bestbuy.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["Best Buy"]
    }

    fn item_id(&self, url: &Url) -> Option<String> {
        url.query()
            .and_then(|q| SKU_PARAM_RE.captures(q))
            .or_else(|| SKU_PATH_RE.captures(url.path()))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn slug(&self, url: &Url) -> Option<String> {
        SLUG_PATH_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| super::generic_slug(url))
    }

    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        structured_parse(url, html, &PRODUCT_MARKUP)
    }

    fn search_url(&self, query: &str) -> String {
        format!("{ORIGIN}/site/searchpage.jsp?st={}", encode_query(query))
    }

    /// JSON-LD item lists when the page ships them, otherwise the
    /// `sku-item` cards.
    fn parse_search_results(&self, html: &str) -> Vec<SearchHit> {
        let structured: Vec<SearchHit> = jsonld::extract_products(html)
            .into_iter()
            .filter(|fields| fields.url.is_some() && fields.title.is_some())
            .map(|fields| SearchHit {
                fields,
                method: ExtractionMethod::Structured,
            })
            .collect();
        if !structured.is_empty() {
            return structured;
        }

        split_blocks(html, &RESULT_MARKER_RE)
            .into_iter()
            .filter_map(|(sku, block)| {
                let href = RESULT_LINK_RE.captures(block)?.get(1)?.as_str();
                let fields = RESULT_MARKUP.extract(block);
                fields.title.as_ref()?;
                Some(SearchHit {
                    fields: ParsedFields {
                        item_id: Some(sku.to_string()),
                        url: Some(absolute_url(ORIGIN, href)),
                        ..fields
                    },
                    method: ExtractionMethod::Heuristic,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use dealscout_core::{Availability, Rating};

    use super::*;

    #[test]
    fn item_id_from_query_or_path() {
        let url = Url::parse(
            "https://www.bestbuy.com/site/sony-wh1000xm5/6505727.p?skuId=6505727",
        )
        .unwrap();
        assert_eq!(BestBuyAdapter.item_id(&url).as_deref(), Some("6505727"));
        assert_eq!(BestBuyAdapter.slug(&url).as_deref(), Some("sony-wh1000xm5"));

        let url = Url::parse("https://www.bestbuy.com/site/sony-wh1000xm5/6505727.p").unwrap();
        assert_eq!(BestBuyAdapter.item_id(&url).as_deref(), Some("6505727"));
    }

    #[test]
    fn parses_product_markup_and_button_state() {
        let html = r#"<div class="sku-title"><h1 class="heading-5">Sony WH-1000XM5</h1></div>
            <div class="priceView-hero-price priceView-customer-price"><span aria-hidden="true">$329.99</span></div>
            <span class="ugc-c-review-average font-weight-medium order-1">4.6</span>
            <button class="add-to-cart-button" data-button-state="SOLD_OUT">Sold Out</button>"#;
        let fields = BestBuyAdapter
            .parse_structured("https://www.bestbuy.com/site/x/6505727.p", html)
            .unwrap();
        assert_eq!(fields.title.as_deref(), Some("Sony WH-1000XM5"));
        assert_eq!(fields.price, Decimal::from_str("329.99").ok());
        assert_eq!(fields.rating, Some(Rating::Stars(4.6)));
        assert_eq!(fields.availability, Some(Availability::OutOfStock));
    }

    #[test]
    fn parses_sku_item_cards() {
        let html = r#"<ol><li class="sku-item" data-sku-id="6505727">
              <h4 class="sku-title"><a href="/site/sony-wh1000xm5/6505727.p?skuId=6505727">Sony WH-1000XM5</a></h4>
              <div class="priceView-customer-price"><span>$329.99</span></div>
              <button data-button-state="ADD_TO_CART">Add to Cart</button></li></ol>"#;
        let hits = BestBuyAdapter.parse_search_results(html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields.item_id.as_deref(), Some("6505727"));
        assert_eq!(
            hits[0].fields.url.as_deref(),
            Some("https://www.bestbuy.com/site/sony-wh1000xm5/6505727.p?skuId=6505727")
        );
        assert_eq!(hits[0].fields.availability, Some(Availability::InStock));
    }
}
