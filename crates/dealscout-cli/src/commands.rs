//! Subcommand handlers. Each prints one pretty-printed JSON document to
//! stdout; logs go to stderr.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use dealscout_core::{ProductLookup, ProductRecord};
use dealscout_deals::PriceProvider;

pub(crate) async fn run_details(provider: &PriceProvider, url: &str) -> anyhow::Result<()> {
    let lookup = provider.get_product_details(url).await;
    print_json(&lookup)?;
    if let ProductLookup::Error { message, .. } = &lookup {
        anyhow::bail!("product lookup failed: {message}");
    }
    Ok(())
}

pub(crate) async fn run_alternatives(provider: &PriceProvider, url: &str) -> anyhow::Result<()> {
    let record = require_record(provider, url).await?;
    let alternatives = provider.find_alternatives(&record).await;
    print_json(&alternatives)
}

pub(crate) async fn run_analyze(provider: &PriceProvider, url: &str) -> anyhow::Result<()> {
    let record = require_record(provider, url).await?;
    let alternatives = provider.find_alternatives(&record).await;
    let verdict = provider.analyze_deal(&record, &alternatives);
    print_json(&verdict)
}

/// Runs the full evaluation. Ctrl-C or the optional deadline cancels the
/// run, which still prints the partial report.
pub(crate) async fn run_evaluate(
    provider: &PriceProvider,
    url: &str,
    deadline_secs: Option<u64>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let canceller = tokio::spawn(async move {
        let deadline = async {
            match deadline_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            () = deadline => tracing::warn!("deadline reached; cancelling evaluation"),
            _ = tokio::signal::ctrl_c() => tracing::warn!("interrupted; cancelling evaluation"),
        }
        trigger.cancel();
    });

    let report = provider.evaluate(url, &cancel).await;
    canceller.abort();
    print_json(&report)
}

async fn require_record(provider: &PriceProvider, url: &str) -> anyhow::Result<ProductRecord> {
    match provider.get_product_details(url).await {
        ProductLookup::Success(record) => Ok(record),
        lookup @ ProductLookup::Error { .. } => {
            print_json(&lookup)?;
            anyhow::bail!("product lookup failed for {url}")
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
