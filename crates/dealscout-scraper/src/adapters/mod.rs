//! Per-retailer source adapters.
//!
//! Every retailer implements [`SourceAdapter`] directly. Adapters differ
//! only in their selectors, URL shapes, and search endpoints; the contract
//! and the error shape are shared. Adapters hold no mutable state, so one
//! instance serves every concurrent query.

mod amazon;
mod best_buy;
mod costco;
mod ebay;
mod target;
mod walmart;

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::Url;

use dealscout_core::{ExtractionMethod, Retailer};

use crate::error::ExtractionError;
use crate::fetch::Fetcher;
use crate::parse::markup::MarkupPatterns;
use crate::parse::{heuristic, jsonld, ParsedFields, SearchHit};

pub use amazon::AmazonAdapter;
pub use best_buy::BestBuyAdapter;
pub use costco::CostcoAdapter;
pub use ebay::EbayAdapter;
pub use target::TargetAdapter;
pub use walmart::WalmartAdapter;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn retailer(&self) -> Retailer;

    /// Registrable domains served by this retailer, e.g. `["bestbuy.com"]`.
    fn domains(&self) -> &'static [&'static str];

    /// Storefront names that pollute page titles.
    fn boilerplate(&self) -> &'static [&'static str];

    /// Retailer-native product identifier embedded in the URL.
    fn item_id(&self, url: &Url) -> Option<String>;

    /// Human-readable product slug embedded in the URL path.
    fn slug(&self, url: &Url) -> Option<String> {
        generic_slug(url)
    }

    /// URL to fetch for a product page. Drops fragments and tracking
    /// parameters so equivalent links share a cache entry.
    fn canonical_url(&self, url: &Url) -> String {
        strip_tracking(url)
    }

    /// Parses retailer-specific structured markup.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::StructuralParse`] when the page lacks the
    /// structured fields this retailer normally renders.
    fn parse_structured(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError>;

    /// Pattern-based extraction from the raw page text.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::StructuralParse`] when even the generic
    /// patterns find no title plus deal signal.
    fn parse_heuristic(&self, url: &str, html: &str) -> Result<ParsedFields, ExtractionError> {
        let fields = heuristic::extract(html, self.boilerplate());
        if fields.is_usable() {
            Ok(fields)
        } else {
            Err(ExtractionError::structural(
                url,
                format!("heuristic patterns: {}", fields.missing_summary()),
            ))
        }
    }

    /// Search page URL for a free-text query.
    fn search_url(&self, query: &str) -> String;

    /// Products listed on a search results page.
    fn parse_search_results(&self, html: &str) -> Vec<SearchHit> {
        jsonld::extract_products(html)
            .into_iter()
            .filter(|fields| fields.url.is_some() && fields.title.is_some())
            .map(|fields| SearchHit {
                fields,
                method: ExtractionMethod::Structured,
            })
            .collect()
    }

    /// Fetches raw page content through the shared fetch collaborator.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's error unchanged.
    async fn fetch_page(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        timeout: Duration,
    ) -> Result<String, ExtractionError> {
        fetcher.fetch(url, timeout).await
    }

    /// Fetches a product page and runs the structured parse on it.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors and structured-parse failures.
    async fn fetch_and_parse(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        timeout: Duration,
    ) -> Result<ParsedFields, ExtractionError> {
        let html = self.fetch_page(fetcher, url, timeout).await?;
        self.parse_structured(url, &html)
    }

    /// Fetches and parses the search page for `query`.
    ///
    /// # Errors
    ///
    /// Propagates fetch errors; an unparseable page yields an empty list.
    async fn search(
        &self,
        fetcher: &dyn Fetcher,
        query: &str,
        timeout: Duration,
    ) -> Result<Vec<SearchHit>, ExtractionError> {
        let url = self.search_url(query);
        let html = self.fetch_page(fetcher, &url, timeout).await?;
        Ok(self.parse_search_results(&html))
    }
}

/// JSON-LD first, then the retailer's markup patterns for anything the
/// JSON-LD block left out.
pub(crate) fn structured_parse(
    url: &str,
    html: &str,
    markup: &MarkupPatterns,
) -> Result<ParsedFields, ExtractionError> {
    let mut fields = jsonld::extract_product(html).unwrap_or_default();
    fields.fill_from(markup.extract(html));
    if fields.is_usable() {
        Ok(fields)
    } else {
        Err(ExtractionError::structural(
            url,
            format!("structured markup: {}", fields.missing_summary()),
        ))
    }
}

/// Encodes a query as `+`-joined percent-encoded terms.
pub(crate) fn encode_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| utf8_percent_encode(term, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Splits a results page into per-item chunks, each starting at a `marker`
/// match. The marker's first capture group (empty when it has none) is
/// returned alongside its chunk.
pub(crate) fn split_blocks<'a>(html: &'a str, marker: &Regex) -> Vec<(&'a str, &'a str)> {
    let starts: Vec<(usize, &str)> = marker
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1).map_or("", |m| m.as_str());
            Some((whole.start(), key))
        })
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(idx, (start, key))| {
            let end = starts.get(idx + 1).map_or(html.len(), |(next, _)| *next);
            (*key, &html[*start..end])
        })
        .collect()
}

/// Resolves a site-relative link against the retailer's origin.
pub(crate) fn absolute_url(origin: &str, href: &str) -> String {
    let href = crate::parse::decode_html(href.trim());
    if href.starts_with("http://") || href.starts_with("https://") {
        href
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

/// Picks the longest path segment that reads like a hyphenated product
/// name: at least two parts with two or more letters each. Segments like
/// `A-12345678` or `dp` never qualify.
pub(crate) fn generic_slug(url: &Url) -> Option<String> {
    url.path_segments()?
        .map(|segment| {
            percent_encoding::percent_decode_str(segment)
                .decode_utf8_lossy()
                .into_owned()
        })
        .filter(|segment| {
            segment
                .split(['-', '_'])
                .filter(|part| part.chars().filter(char::is_ascii_alphabetic).count() >= 2)
                .count()
                >= 2
        })
        .max_by_key(String::len)
}

fn strip_tracking(url: &Url) -> String {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let key = key.to_ascii_lowercase();
            let tracking = matches!(
                key.as_str(),
                "ref" | "ref_" | "tag" | "psc" | "_trksid" | "clickid"
            );
            !(key.starts_with("utm_") || tracking)
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.query_pairs_mut().clear().extend_pairs(kept);
    }
    canonical.to_string()
}
