use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use dealscout_core::Retailer;

use super::{encode_query, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::ParsedFields;

static ITEM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.product\.(\d+)\.html").expect("valid regex"));
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/]+)\.product\.\d+\.html").expect("valid regex"));

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<h1[^>]*itemprop="name"[^>]*>(.*?)</h1>"#,
        r#"(?is)<span[^>]*class="value"[^>]*>(.*?)</span>"#,
        Some(r#"(?is)itemprop="ratingValue"[^>]*content="([\d.]+)""#),
        Some(r#"(?is)<input[^>]*id="add-to-cart-btn"[^>]*value="([^"]+)""#),
    )
});

pub struct CostcoAdapter;

impl SourceAdapter for CostcoAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::Costco
    }

    fn domains(&self) -> &'static [&'static str] {
        &["costco.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["Costco"]
    }

    fn item_id(&self, url: &Url) -> Option<String> {
        ITEM_ID_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn slug(&self, url: &Url) -> Option<String> {
        SLUG_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| super::generic_slug(url))
    }

    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        structured_parse(url, html, &PRODUCT_MARKUP)
    }

    fn search_url(&self, query: &str) -> String {
        format!("https://www.costco.com/CatalogSearch?keyword={}", encode_query(query))
    }
}
