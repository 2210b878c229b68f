//! Cross-retailer search for comparable offers.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use dealscout_core::{
    AlternativeCandidate, AppConfig, Availability, ProductRecord, Retailer, ScoringWeights,
};
use dealscout_scraper::{with_budget, AdapterRegistry, Fetcher, SearchHit};

use crate::comparison::compare;
use crate::search_key::{relevance, search_key};

const NO_SEARCH_PRICE_TEXT: &str = "Price unavailable: not shown in search results";

/// Knobs for one alternatives search.
#[derive(Debug, Clone)]
pub struct AlternativesOptions {
    pub max_alternatives: usize,
    pub fan_out_limit: usize,
    pub adapter_timeout: Duration,
    pub search_key_max_tokens: usize,
    /// Minimum share of search-key tokens a hit's title must contain.
    pub min_relevance: f64,
    pub per_retailer_limit: usize,
}

impl Default for AlternativesOptions {
    fn default() -> Self {
        Self {
            max_alternatives: 5,
            fan_out_limit: 6,
            adapter_timeout: Duration::from_secs(10),
            search_key_max_tokens: 6,
            min_relevance: 0.3,
            per_retailer_limit: 3,
        }
    }
}

impl AlternativesOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_alternatives: config.max_alternatives,
            fan_out_limit: config.fan_out_limit.max(1),
            adapter_timeout: config.adapter_timeout(),
            ..Self::default()
        }
    }
}

pub struct AlternativesFinder {
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn Fetcher>,
    weights: ScoringWeights,
    options: AlternativesOptions,
}

impl AlternativesFinder {
    #[must_use]
    pub fn new(
        registry: Arc<AdapterRegistry>,
        fetcher: Arc<dyn Fetcher>,
        weights: ScoringWeights,
        options: AlternativesOptions,
    ) -> Self {
        Self {
            registry,
            fetcher,
            weights,
            options,
        }
    }

    /// Searches every other retailer for `primary` and ranks what comes back.
    ///
    /// Adapters that fail or run out of time are logged and skipped. Once
    /// `cancel` fires, pending searches are dropped and the hits gathered so
    /// far are ranked.
    pub async fn find(
        &self,
        primary: &ProductRecord,
        cancel: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let key = search_key(&primary.title, self.options.search_key_max_tokens);
        if key.is_empty() {
            tracing::debug!(title = %primary.title, "no salient tokens in title; skipping search");
            return Vec::new();
        }
        let query = key.join(" ");
        let timeout = self.options.adapter_timeout;
        let fetcher = self.fetcher.as_ref();

        let responses: Vec<(Retailer, Vec<SearchHit>)> =
            stream::iter(self.registry.alternatives_for(primary.source))
                .map(|adapter| {
                    let query = query.as_str();
                    async move {
                        let url = adapter.search_url(query);
                        let outcome = with_budget(
                            &url,
                            timeout,
                            cancel,
                            adapter.search(fetcher, query, timeout),
                        )
                        .await;
                        (adapter, outcome)
                    }
                })
                .buffer_unordered(self.options.fan_out_limit.max(1))
                .filter_map(|(adapter, outcome)| async move {
                    match outcome {
                        Ok(hits) => Some((adapter.retailer(), hits)),
                        Err(e) => {
                            tracing::warn!(
                                retailer = %adapter.retailer(),
                                error = %e,
                                "alternative source dropped"
                            );
                            None
                        }
                    }
                })
                .collect()
                .await;

        let mut candidates: Vec<AlternativeCandidate> = self
            .relevant_records(primary.source, &key, responses)
            .into_iter()
            .map(|record| {
                let comparison = compare(primary, &record, &self.weights);
                AlternativeCandidate {
                    record,
                    is_better_deal: comparison.is_better_deal,
                    reason: comparison.reason,
                    comparison_score: comparison.score,
                }
            })
            .collect();

        rank(&mut candidates);
        candidates.truncate(self.options.max_alternatives);
        tracing::debug!(
            retailer = %primary.source,
            query = %query,
            kept = candidates.len(),
            "alternatives ranked"
        );
        candidates
    }

    /// Applies the origin, title, relevance, duplicate, and per-retailer
    /// filters across every response.
    ///
    /// Responses are walked in retailer order and hits in page order, so the
    /// kept set never depends on which search answered first. The
    /// per-retailer cap counts the retailer a hit links to, not the one whose
    /// search returned it.
    fn relevant_records(
        &self,
        origin: Retailer,
        key: &[String],
        mut responses: Vec<(Retailer, Vec<SearchHit>)>,
    ) -> Vec<ProductRecord> {
        responses.sort_by_key(|(retailer, _)| *retailer);
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut per_retailer: HashMap<Retailer, usize> = HashMap::new();
        let mut records = Vec::new();

        for (retailer, hits) in responses {
            for hit in hits {
                let Some(url) = hit.fields.url.clone() else {
                    continue;
                };
                let Some(title) = hit.fields.title.clone().filter(|t| !t.trim().is_empty()) else {
                    continue;
                };
                // Marketplace results sometimes link back to another storefront.
                let (source, identity) = match self.registry.classify(&url) {
                    Ok((classified, parsed)) => {
                        let identity = self
                            .registry
                            .adapter(classified)
                            .map_or_else(|| parsed.to_string(), |a| a.canonical_url(&parsed));
                        (classified, identity)
                    }
                    Err(_) => (retailer, url.clone()),
                };
                if source == origin || relevance(key, &title) < self.options.min_relevance {
                    continue;
                }
                let kept = per_retailer.entry(source).or_insert(0);
                if *kept >= self.options.per_retailer_limit || !seen_urls.insert(identity) {
                    continue;
                }
                *kept += 1;
                records.push(record_from_hit(source, url, title, hit));
            }
        }
        records
    }
}

fn record_from_hit(source: Retailer, url: String, title: String, hit: SearchHit) -> ProductRecord {
    let fields = hit.fields;
    ProductRecord {
        url,
        source,
        title,
        price: fields.price,
        price_text: fields
            .price_text
            .unwrap_or_else(|| NO_SEARCH_PRICE_TEXT.to_owned()),
        rating: fields.rating,
        availability: fields.availability.unwrap_or(Availability::Unknown),
        item_id: fields.item_id,
        extraction_method: hit.method,
        confidence: hit.method.confidence(),
        fetched_at: Utc::now(),
    }
}

/// Highest score first; ties break on retailer, title, then URL so the
/// order never depends on which search answered first.
fn rank(candidates: &mut [AlternativeCandidate]) {
    candidates.sort_by(|a, b| {
        b.comparison_score
            .partial_cmp(&a.comparison_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.record.source.cmp(&b.record.source))
            .then_with(|| a.record.title.cmp(&b.record.title))
            .then_with(|| a.record.url.cmp(&b.record.url))
    });
}

#[cfg(test)]
#[path = "alternatives_test.rs"]
mod tests;
