//! Three-tier product extraction: structured markup, heuristic patterns,
//! then a record synthesized from the URL.
//!
//! Any syntactically valid URL for a supported retailer yields a
//! [`ProductLookup::Success`]. An error lookup is returned only when the URL
//! cannot be classified, or when nothing could be fetched and the URL
//! carries neither a slug nor an item id.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use dealscout_core::{Availability, ExtractionMethod, ProductLookup, ProductRecord, Retailer};

use crate::adapters::SourceAdapter;
use crate::error::ExtractionError;
use crate::fetch::{with_budget, Fetcher};
use crate::parse::{format_usd, jsonld, ParsedFields};
use crate::registry::AdapterRegistry;
use crate::synthetic;

const NO_PRICE_TEXT: &str = "Price unavailable: no price found on page";
const NO_CONTENT: &str = "no content fetched";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Succeeded,
    Failed(String),
}

/// One tier the pipeline ran and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAttempt {
    pub tier: ExtractionMethod,
    pub outcome: TierOutcome,
}

/// A lookup plus the ordered list of tiers attempted to produce it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub lookup: ProductLookup,
    pub trace: Vec<TierAttempt>,
}

impl Extraction {
    fn error(url: &str, message: String, trace: Vec<TierAttempt>) -> Self {
        Self {
            lookup: ProductLookup::Error {
                url: url.to_owned(),
                message,
            },
            trace,
        }
    }
}

pub struct ExtractionPipeline {
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl ExtractionPipeline {
    #[must_use]
    pub fn new(
        registry: Arc<AdapterRegistry>,
        fetcher: Arc<dyn Fetcher>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            timeout,
        }
    }

    /// Extracts a product record for `url`, degrading tier by tier.
    ///
    /// Never fails: problems are reported through the lookup status and the
    /// trace. A fired `cancel` token counts as a failed fetch.
    pub async fn extract(&self, url: &str, cancel: &CancellationToken) -> Extraction {
        let (retailer, parsed) = match self.registry.classify(url) {
            Ok(classified) => classified,
            Err(e) => {
                tracing::debug!(url, error = %e, "URL rejected by classifier");
                return Extraction::error(url, e.to_string(), Vec::new());
            }
        };
        let Some(adapter) = self.registry.adapter(retailer) else {
            let message = format!("no adapter registered for {retailer}");
            return Extraction::error(url, message, Vec::new());
        };

        let target = adapter.canonical_url(&parsed);
        let mut trace = Vec::with_capacity(3);

        let fetched = with_budget(
            &target,
            self.timeout,
            cancel,
            adapter.fetch_page(self.fetcher.as_ref(), &target, self.timeout),
        )
        .await;

        match fetched {
            Ok(html) => {
                if let Some(record) = content_tiers(adapter, &target, &html, &mut trace) {
                    return Extraction {
                        lookup: ProductLookup::Success(record),
                        trace,
                    };
                }
            }
            Err(e) if !e.is_recoverable() => {
                return Extraction::error(url, e.to_string(), trace);
            }
            Err(e) => {
                tracing::debug!(
                    url = %target,
                    retailer = %retailer,
                    tier = "structured",
                    error = %e,
                    "fetch failed"
                );
                trace.push(failed(ExtractionMethod::Structured, &e));
                tracing::debug!(
                    url = %target,
                    retailer = %retailer,
                    tier = "heuristic",
                    "skipping parse: {NO_CONTENT}"
                );
                trace.push(TierAttempt {
                    tier: ExtractionMethod::Heuristic,
                    outcome: TierOutcome::Failed(NO_CONTENT.to_owned()),
                });
            }
        }

        synthetic_tier(adapter, retailer, &parsed, &target, trace)
    }
}

/// Structured then heuristic parsing over the fetched page.
fn content_tiers(
    adapter: &dyn SourceAdapter,
    target: &str,
    html: &str,
    trace: &mut Vec<TierAttempt>,
) -> Option<ProductRecord> {
    let retailer = adapter.retailer();
    let url_item_id = reqwest::Url::parse(target)
        .ok()
        .and_then(|u| adapter.item_id(&u));

    match adapter.parse_structured(target, html) {
        Ok(fields) => {
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "structured",
                "tier succeeded"
            );
            trace.push(succeeded(ExtractionMethod::Structured));
            return Some(build_record(
                retailer,
                target,
                fields,
                ExtractionMethod::Structured,
                url_item_id,
            ));
        }
        Err(e) => {
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "structured",
                error = %e,
                "tier failed"
            );
            trace.push(failed(ExtractionMethod::Structured, &e));
        }
    }

    match adapter.parse_heuristic(target, html) {
        Ok(heuristic) => {
            // Whatever structured data the page did carry outranks the
            // generic patterns field by field.
            let mut fields = jsonld::extract_product(html).unwrap_or_default();
            fields.fill_from(heuristic);
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "heuristic",
                "tier succeeded"
            );
            trace.push(succeeded(ExtractionMethod::Heuristic));
            Some(build_record(
                retailer,
                target,
                fields,
                ExtractionMethod::Heuristic,
                url_item_id,
            ))
        }
        Err(e) => {
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "heuristic",
                error = %e,
                "tier failed"
            );
            trace.push(failed(ExtractionMethod::Heuristic, &e));
            None
        }
    }
}

fn synthetic_tier(
    adapter: &dyn SourceAdapter,
    retailer: Retailer,
    parsed: &reqwest::Url,
    target: &str,
    mut trace: Vec<TierAttempt>,
) -> Extraction {
    let slug = adapter.slug(parsed);
    let item_id = adapter.item_id(parsed);

    match synthetic::from_url(retailer, slug.as_deref(), item_id.as_deref()) {
        Some(fields) => {
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "synthetic",
                "tier succeeded"
            );
            trace.push(succeeded(ExtractionMethod::Synthetic));
            Extraction {
                lookup: ProductLookup::Success(build_record(
                    retailer,
                    target,
                    fields,
                    ExtractionMethod::Synthetic,
                    item_id,
                )),
                trace,
            }
        }
        None => {
            let reason = "URL has neither a product slug nor an item id";
            tracing::debug!(
                url = %target,
                retailer = %retailer,
                tier = "synthetic",
                reason,
                "tier failed"
            );
            trace.push(TierAttempt {
                tier: ExtractionMethod::Synthetic,
                outcome: TierOutcome::Failed(reason.to_owned()),
            });
            let message = format!(
                "could not extract product from {retailer} page: {}",
                failure_summary(&trace)
            );
            Extraction::error(target, message, trace)
        }
    }
}

fn succeeded(tier: ExtractionMethod) -> TierAttempt {
    TierAttempt {
        tier,
        outcome: TierOutcome::Succeeded,
    }
}

fn failed(tier: ExtractionMethod, error: &ExtractionError) -> TierAttempt {
    TierAttempt {
        tier,
        outcome: TierOutcome::Failed(error.to_string()),
    }
}

fn failure_summary(trace: &[TierAttempt]) -> String {
    trace
        .iter()
        .filter_map(|attempt| match &attempt.outcome {
            TierOutcome::Failed(reason) => Some(format!("{}: {reason}", attempt.tier)),
            TierOutcome::Succeeded => None,
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn build_record(
    retailer: Retailer,
    url: &str,
    fields: ParsedFields,
    method: ExtractionMethod,
    url_item_id: Option<String>,
) -> ProductRecord {
    let price_text = fields
        .price_text
        .or_else(|| fields.price.map(format_usd))
        .unwrap_or_else(|| NO_PRICE_TEXT.to_owned());

    ProductRecord {
        url: url.to_owned(),
        source: retailer,
        title: fields.title.unwrap_or_default(),
        price: fields.price,
        price_text,
        rating: fields.rating,
        availability: fields.availability.unwrap_or(Availability::Unknown),
        item_id: url_item_id.or(fields.item_id),
        extraction_method: method,
        confidence: method.confidence(),
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
