//! End-to-end tests for `PriceProvider` against `StaticFetcher` fixtures.
//!
//! No network traffic: every page the adapters ask for is served from an
//! in-memory route table, and unknown URLs answer like a 404.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use dealscout_core::{AppConfig, Availability, ExtractionMethod, ProductLookup, Rating, Retailer};
use dealscout_deals::PriceProvider;
use dealscout_scraper::{StaticFetcher, StaticReply};

const TARGET_URL: &str = "https://www.target.com/p/sony-wh-1000xm5-headphones/-/A-86100000";

/// Target listing with a rating and stock status but no price.
const TARGET_PAGE: &str = r#"<html><head><title>Sony WH-1000XM5 : Target</title>
<script type="application/ld+json">
{"@context":"https://schema.org","@type":"Product",
 "name":"Sony WH-1000XM5 Wireless Noise Canceling Headphones",
 "sku":"86100000",
 "aggregateRating":{"@type":"AggregateRating","ratingValue":4.6,"reviewCount":1200},
 "offers":{"@type":"Offer","availability":"https://schema.org/InStock"}}
</script></head><body></body></html>"#;

const BEST_BUY_SEARCH: &str = r#"<html><script type="application/ld+json">
{"@type":"ItemList","itemListElement":[{"@type":"ListItem","position":1,"item":{
 "@type":"Product",
 "name":"Sony WH-1000XM5 Wireless Noise Canceling Headphones - Black",
 "url":"https://www.bestbuy.com/site/sony-wh1000xm5/6505727.p?skuId=6505727",
 "aggregateRating":{"ratingValue":4.1,"reviewCount":300},
 "offers":{"price":"49.99","priceCurrency":"USD","availability":"https://schema.org/InStock"}}}]}
</script></html>"#;

fn test_config() -> AppConfig {
    AppConfig {
        adapter_timeout_secs: 5,
        ..AppConfig::default()
    }
}

fn provider(fetcher: Arc<StaticFetcher>) -> PriceProvider {
    PriceProvider::with_fetcher(test_config(), fetcher)
}

fn scenario_fetcher() -> Arc<StaticFetcher> {
    Arc::new(
        StaticFetcher::new()
            .with_page(TARGET_URL, TARGET_PAGE)
            .with_prefix(
                "https://www.bestbuy.com/site/searchpage.jsp",
                StaticReply::Page(BEST_BUY_SEARCH.to_string()),
            ),
    )
}

#[tokio::test]
async fn rating_led_verdict_when_price_is_missing() {
    let provider = provider(scenario_fetcher());
    let report = provider.evaluate(TARGET_URL, &CancellationToken::new()).await;

    let record = report.product.record().expect("expected a product record");
    assert_eq!(record.source, Retailer::Target);
    assert_eq!(record.price, None);
    assert_eq!(record.rating, Some(Rating::Stars(4.6)));
    assert_eq!(record.availability, Availability::InStock);
    assert_eq!(record.extraction_method, ExtractionMethod::Structured);

    assert_eq!(report.alternatives.len(), 1);
    let alternative = &report.alternatives[0].record;
    assert_eq!(alternative.source, Retailer::BestBuy);
    assert_eq!(alternative.price, Decimal::from_str("49.99").ok());

    let verdict = report.verdict.expect("expected a verdict");
    assert!(verdict.is_good_deal, "{verdict:?}");
    assert_eq!(verdict.reasons[0], "Rating 4.6 vs. average 4.1 among alternatives");
    assert!(!verdict.verdict.to_lowercase().contains("price"));
    assert!(verdict
        .reasons
        .last()
        .is_some_and(|r| r.starts_with("Price unavailable")));
    assert!(!report.cancelled);
    provider.close();
}

#[tokio::test]
async fn repeated_lookups_match_and_hit_the_network_once() {
    let fetcher = scenario_fetcher();
    let provider = provider(fetcher.clone());

    let first = provider.get_product_details(TARGET_URL).await;
    let second = provider.get_product_details(TARGET_URL).await;

    let (Some(a), Some(b)) = (first.record(), second.record()) else {
        panic!("expected two successful lookups, got: {first:?} / {second:?}");
    };
    assert_eq!(a.without_timestamp(), b.without_timestamp());
    assert_eq!(fetcher.calls(TARGET_URL), 1);
}

#[tokio::test]
async fn every_supported_retailer_degrades_to_a_synthetic_record() {
    let fetcher = Arc::new(StaticFetcher::new().with_prefix("https://", StaticReply::Status(503)));
    let provider = provider(fetcher);

    let urls = [
        "https://www.amazon.com/Sony-WH-1000XM5-Headphones/dp/B09XS7JWHH",
        "https://www.walmart.com/ip/Sony-WH-1000XM5-Headphones/123456789",
        TARGET_URL,
        "https://www.bestbuy.com/site/sony-wh-1000xm5-headphones/6505727.p?skuId=6505727",
        "https://www.ebay.com/itm/285012345678",
        "https://www.costco.com/sony-wh-1000xm5-headphones.product.100123456.html",
    ];
    for url in urls {
        let lookup = provider.get_product_details(url).await;
        let record = lookup
            .record()
            .unwrap_or_else(|| panic!("expected success for {url}, got: {lookup:?}"));
        assert_eq!(record.extraction_method, ExtractionMethod::Synthetic);
        assert!((record.confidence - 0.1).abs() < f64::EPSILON);
        assert_eq!(record.price, None);
        assert!(!record.title.is_empty());
    }
}

#[tokio::test]
async fn alternatives_skip_the_origin_and_respect_the_cap() {
    let target_search = r#"<script type="application/ld+json">
        {"@type":"ItemList","itemListElement":[
        {"item":{"@type":"Product","name":"Sony WH-1000XM5 Wireless Headphones",
                 "url":"https://www.target.com/p/a/-/A-1","offers":{"price":"330.00"}}},
        {"item":{"@type":"Product","name":"Sony WH-1000XM5 Headphones Silver",
                 "url":"https://www.target.com/p/b/-/A-2","offers":{"price":"335.00"}}}]}
        </script>"#;
    let walmart_page = r#"<script type="application/ld+json">
        {"@type":"Product","name":"Sony WH-1000XM5 Wireless Headphones",
         "offers":{"price":"348.00","priceCurrency":"USD"}}</script>"#;
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page("https://www.walmart.com/ip/sony-wh-1000xm5/123456789", walmart_page)
            .with_prefix("https://www.target.com/s", StaticReply::Page(target_search.to_string()))
            .with_prefix(
                "https://www.bestbuy.com/site/searchpage.jsp",
                StaticReply::Page(BEST_BUY_SEARCH.to_string()),
            ),
    );
    let config = AppConfig {
        max_alternatives: 2,
        ..test_config()
    };
    let provider = PriceProvider::with_fetcher(config, fetcher.clone());

    let lookup = provider
        .get_product_details("https://www.walmart.com/ip/sony-wh-1000xm5/123456789")
        .await;
    let record = lookup.into_record().expect("expected walmart record");
    let alternatives = provider.find_alternatives(&record).await;

    assert_eq!(alternatives.len(), 2);
    assert!(alternatives.iter().all(|a| a.record.source != Retailer::Walmart));
    // the product page plus one search per other retailer
    assert_eq!(fetcher.total_calls(), 1 + Retailer::ALL.len() - 1);
}

#[tokio::test]
async fn pre_cancelled_evaluation_returns_a_partial_report() {
    let fetcher = scenario_fetcher();
    let provider = provider(fetcher.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = provider.evaluate(TARGET_URL, &cancel).await;

    assert!(report.cancelled);
    let record = report.product.record().expect("synthetic record expected");
    assert_eq!(record.extraction_method, ExtractionMethod::Synthetic);
    assert!(report.alternatives.is_empty());
    assert!(report.verdict.is_some());
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn cancellation_mid_search_keeps_the_primary_record() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page(TARGET_URL, TARGET_PAGE)
            .with_prefix(
                "https://",
                StaticReply::Slow {
                    delay: Duration::from_secs(30),
                    body: BEST_BUY_SEARCH.to_string(),
                },
            ),
    );
    let provider = provider(fetcher);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        provider.evaluate(TARGET_URL, &cancel),
    )
    .await
    .expect("cancellation should end the run promptly");

    assert!(report.cancelled);
    let record = report.product.record().expect("expected the primary record");
    assert_eq!(record.extraction_method, ExtractionMethod::Structured);
    assert!(report.alternatives.is_empty());
    let verdict = report.verdict.expect("expected a verdict over partial data");
    assert!(verdict
        .reasons
        .iter()
        .any(|r| r.starts_with("No comparable alternatives")));
}

#[tokio::test]
async fn close_is_idempotent_and_the_next_call_reopens() {
    let fetcher = scenario_fetcher();
    let provider = provider(fetcher.clone());
    assert!(!provider.is_open());

    provider.open().expect("open should succeed with an injected fetcher");
    assert!(provider.is_open());
    assert!(provider.get_product_details(TARGET_URL).await.is_success());

    provider.close();
    provider.close();
    assert!(!provider.is_open());

    assert!(provider.get_product_details(TARGET_URL).await.is_success());
    assert!(provider.is_open());
    // the cache went away with the old session
    assert_eq!(fetcher.calls(TARGET_URL), 2);
}

#[tokio::test]
async fn unsupported_url_yields_an_error_report() {
    let fetcher = Arc::new(StaticFetcher::new());
    let provider = provider(fetcher.clone());

    let report = provider
        .evaluate("https://www.newegg.com/p/N82E16826", &CancellationToken::new())
        .await;

    assert!(matches!(report.product, ProductLookup::Error { .. }));
    assert!(report.verdict.is_none());
    assert!(report.alternatives.is_empty());
    assert_eq!(fetcher.total_calls(), 0);

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["product"]["status"], "error");
}
