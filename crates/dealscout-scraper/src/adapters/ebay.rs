use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use dealscout_core::{ExtractionMethod, Retailer};

use super::{encode_query, split_blocks, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::{ParsedFields, SearchHit};

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/itm/(?:[^/]+/)?(\d{9,})").expect("valid regex"));
static RESULT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<li[^>]*class="s-item[ "]"#).expect("valid regex"));
static RESULT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="s-item__link"[^>]*href="([^"]+)""#).expect("valid regex")
});

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<h1[^>]*class="x-item-title__mainTitle"[^>]*>(.*?)</h1>"#,
        r#"(?is)<div[^>]*class="x-price-primary"[^>]*>(.*?)</div>"#,
        Some(r#"(?is)<span[^>]*class="ux-summary__start--rating"[^>]*>(.*?)</span>"#),
        Some(r#"(?is)<div[^>]*id="qtySubTxt"[^>]*>(.*?)</div>"#),
    )
});
static RESULT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<div[^>]*class="s-item__title"[^>]*>(.*?)</div>"#,
        r#"(?is)<span[^>]*class="s-item__price"[^>]*>(.*?)</span>"#,
        Some(r"(?is)([\d.]+) out of 5 stars"),
        None,
    )
});

/// Placeholder card eBay renders at the top of every result list.
const PLACEHOLDER_TITLE: &str = "Shop on eBay";

pub struct EbayAdapter;

impl SourceAdapter for EbayAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::Ebay
    }

    fn domains(&self) -> &'static [&'static str] {
        &["ebay.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["eBay"]
    }

    fn item_id(&self, url: &Url) -> Option<String> {
        ITEM_ID_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        structured_parse(url, html, &PRODUCT_MARKUP)
    }

    fn search_url(&self, query: &str) -> String {
        format!("https://www.ebay.com/sch/i.html?_nkw={}", encode_query(query))
    }

    fn parse_search_results(&self, html: &str) -> Vec<SearchHit> {
        split_blocks(html, &RESULT_MARKER_RE)
            .into_iter()
            .filter_map(|(_, block)| {
                let href = RESULT_LINK_RE.captures(block)?.get(1)?.as_str();
                let fields = RESULT_MARKUP.extract(block);
                if fields.title.as_deref().is_none_or(|t| t == PLACEHOLDER_TITLE) {
                    return None;
                }
                let link = href.split('?').next().unwrap_or(href).to_string();
                let item_id = Url::parse(&link).ok().and_then(|u| self.item_id(&u));
                Some(SearchHit {
                    fields: ParsedFields {
                        item_id,
                        url: Some(link),
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

    use dealscout_core::Availability;

    use super::*;

    #[test]
    fn item_id_with_and_without_slug() {
        let url =
            Url::parse("https://www.ebay.com/itm/Sony-WH-1000XM5-Headphones/285012345678").unwrap();
        assert_eq!(EbayAdapter.item_id(&url).as_deref(), Some("285012345678"));
        let url = Url::parse("https://www.ebay.com/itm/285012345678?hash=item1").unwrap();
        assert_eq!(EbayAdapter.item_id(&url).as_deref(), Some("285012345678"));
    }

    #[test]
    fn parses_listing_markup() {
        let html = r#"<h1 class="x-item-title__mainTitle"><span>Sony WH-1000XM5 Headphones</span></h1>
            <div class="x-price-primary"><span>US $279.00</span></div>
            <div id="qtySubTxt"><span>More than 10 available</span></div>"#;
        let fields = EbayAdapter
            .parse_structured("https://www.ebay.com/itm/285012345678", html)
            .unwrap();
        assert_eq!(fields.price, Decimal::from_str("279.00").ok());
        assert_eq!(fields.availability, Some(Availability::InStock));
    }

    #[test]
    fn search_skips_placeholder_card() {
        let html = r#"<ul>
            <li class="s-item s-item__pl-on-bottom"><a class="s-item__link" href="https://ebay.com/itm/123456">
              <div class="s-item__title"><span>Shop on eBay</span></div></a></li>
            <li class="s-item"><a class="s-item__link" href="https://www.ebay.com/itm/285012345678?hash=x">
              <div class="s-item__title"><span>Sony WH-1000XM5</span></div></a>
              <span class="s-item__price">$249.99</span></li></ul>"#;
        let hits = EbayAdapter.parse_search_results(html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields.url.as_deref(), Some("https://www.ebay.com/itm/285012345678"));
        assert_eq!(hits[0].fields.item_id.as_deref(), Some("285012345678"));
        assert_eq!(hits[0].fields.price, Decimal::from_str("249.99").ok());
    }
}
