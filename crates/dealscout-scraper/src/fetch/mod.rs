//! The fetch collaborator: raw page content in, transient errors out.
//!
//! The pipeline treats fetching as an opaque capability. Retry policy lives
//! inside the implementation ([`HttpFetcher`]); the per-call budget and
//! cancellation are applied uniformly by [`with_budget`].

mod cache;
mod http;
mod fixture;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ExtractionError;

pub use cache::CachingFetcher;
pub use fixture::{StaticFetcher, StaticReply};
pub use http::HttpFetcher;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body at `url`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a transient [`ExtractionError`] for network or server
    /// failures, and a non-transient one for pages that will not improve on
    /// retry (404, bot challenges).
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError>;
}

/// Runs one adapter operation under its own timeout and the caller's
/// cancellation token.
///
/// A timeout surfaces as [`ExtractionError::Timeout`] and a cancellation as
/// [`ExtractionError::Cancelled`]; in both cases the inner future is dropped.
///
/// # Errors
///
/// Returns the inner error, or the timeout/cancellation error described above.
pub async fn with_budget<T, F>(
    url: &str,
    budget: Duration,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ExtractionError>
where
    F: Future<Output = Result<T, ExtractionError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExtractionError::Cancelled { url: url.to_owned() }),
        outcome = tokio::time::timeout(budget, operation) => match outcome {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                url: url.to_owned(),
                timeout_ms: budget.as_millis(),
            }),
        },
    }
}
