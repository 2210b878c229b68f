use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use dealscout_core::{ExtractionMethod, Retailer};

use super::{encode_query, split_blocks, structured_parse, SourceAdapter};
use crate::error::ExtractionError;
use crate::parse::markup::MarkupPatterns;
use crate::parse::{ParsedFields, SearchHit};

static ASIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:dp|gp/product|gp/aw/d)/([A-Z0-9]{10})(?:[/?]|$)").expect("valid regex")
});
static RESULT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-asin="([A-Z0-9]{10})""#).expect("valid regex"));

static PRODUCT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r#"(?is)<span[^>]*id="productTitle"[^>]*>(.*?)</span>"#,
        r#"(?is)<span[^>]*class="a-offscreen"[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<span[^>]*class="a-icon-alt"[^>]*>(.*?)</span>"#),
        Some(r#"(?is)<div[^>]*id="availability"[^>]*>(.*?)</div>"#),
    )
});
static RESULT_MARKUP: LazyLock<MarkupPatterns> = LazyLock::new(|| {
    MarkupPatterns::new(
        r"(?is)<h2[^>]*>(.*?)</h2>",
        r#"(?is)<span[^>]*class="a-offscreen"[^>]*>(.*?)</span>"#,
        Some(r#"(?is)<span[^>]*class="a-icon-alt"[^>]*>(.*?)</span>"#),
        None,
    )
});

pub struct AmazonAdapter;

impl AmazonAdapter {
    fn asin(url: &Url) -> Option<String> {
        ASIN_RE
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl SourceAdapter for AmazonAdapter {
    fn retailer(&self) -> Retailer {
        Retailer::Amazon
    }

    fn domains(&self) -> &'static [&'static str] {
        &["amazon.com"]
    }

    fn boilerplate(&self) -> &'static [&'static str] {
        &["Amazon.com"]
    }

    fn item_id(&self, url: &Url) -> Option<String> {
        Self::asin(url)
    }

    /// Product pages collapse to `/dp/<ASIN>`; the slug and ref path are noise.
    fn canonical_url(&self, url: &Url) -> String {
        match Self::asin(url) {
            Some(asin) => format!("https://www.amazon.com/dp/{asin}"),
            None => super::strip_tracking(url),
        }
    }

    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        structured_parse(url, html, &PRODUCT_MARKUP)
    }

    fn search_url(&self, query: &str) -> String {
        format!("https://www.amazon.com/s?k={}", encode_query(query))
    }

    /// Search results carry no JSON-LD; each result is a `data-asin` card.
    fn parse_search_results(&self, html: &str) -> Vec<SearchHit> {
        split_blocks(html, &RESULT_MARKER_RE)
            .into_iter()
            .filter_map(|(asin, block)| {
                let fields = RESULT_MARKUP.extract(block);
                fields.title.as_ref()?;
                Some(SearchHit {
                    fields: ParsedFields {
                        item_id: Some(asin.to_string()),
                        url: Some(format!("https://www.amazon.com/dp/{asin}")),
                        ..fields
                    },
                    method: ExtractionMethod::Heuristic,
                })
            })
            .collect()
    }
}
