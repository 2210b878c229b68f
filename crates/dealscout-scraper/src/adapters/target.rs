use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use dealscout_core::Retailer;

use super::{encode_query, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::ParsedFields;

static TCIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/A-(\d+)").expect("valid regex"));

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<h1[^>]*data-test="product-title"[^>]*>(.*?)</h1>"#,
        r#"(?is)<span[^>]*data-test="product-price"[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<span[^>]*data-test="rating-value"[^>]*>(.*?)</span>"#),
        Some(r#"(?is)<div[^>]*data-test="fulfillment-cell-shipping"[^>]*>(.*?)</div>"#),
    )
});

pub struct TargetAdapter;

impl SourceAdapter for TargetAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::Target
    }

    fn domains(&self) -> &'static [&'static str] {
        &["target.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["Target"]
    }

    /// Target's TCIN, the `A-` suffix of every product path.
    fn item_id(&self, url: &Url) -> Option<String> {
        TCIN_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        structured_parse(url, html, &PRODUCT_MARKUP)
    }

    fn search_url(&self, query: &str) -> String {
        format!("https://www.target.com/s?searchTerm={}", encode_query(query))
    }
}

#[cfg(test)]
mod tests {
    use dealscout_core::{Availability, Rating};

    use super::*;

    #[test]
    fn item_id_is_tcin() {
        let url = Url::parse(
            "https://www.target.com/p/ninja-air-fryer-4qt/-/A-81223456#lnk=sametab",
        )
        .unwrap();
        assert_eq!(TargetAdapter.item_id(&url).as_deref(), Some("81223456"));
        assert_eq!(
            TargetAdapter.canonical_url(&url),
            "https://www.target.com/p/ninja-air-fryer-4qt/-/A-81223456"
        );
    }

    #[test]
    fn price_may_be_absent_when_markup_has_rating_and_stock() {
        let html = r#"<h1 data-test="product-title"><span>Ninja Air Fryer 4qt</span></h1>
            <span data-test="rating-value">4.6</span>
            <div data-test="fulfillment-cell-shipping"><span>In stock</span> Ships today</div>"#;
        let fields = TargetAdapter
            .parse_structured("https://www.target.com/p/x/-/A-1", html)
            .unwrap();
        assert_eq!(fields.price, None);
        assert_eq!(fields.rating, Some(Rating::Stars(4.6)));
        assert_eq!(fields.availability, Some(Availability::InStock));
    }

    #[test]
    fn search_results_come_from_item_list_jsonld() {
        let html = r#"<script type="application/ld+json">{"@type":"ItemList","itemListElement":[
            {"@type":"ListItem","item":{"@type":"Product","name":"Ninja Air Fryer",
             "url":"https://www.target.com/p/ninja/-/A-2","offers":{"price":"89.99"}}}]}</script>"#;
        let hits = TargetAdapter.parse_search_results(html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fields.title.as_deref(), Some("Ninja Air Fryer"));
    }
}
