use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::Fetcher;
use crate::error::ExtractionError;

/// Per-session memoization of successful fetches.
///
/// Repeated lookups of the same URL within one session (re-evaluating a
/// product, or a search page shared by two queries) hit the network once.
/// Failures are never cached. The lock is held only for map access, never
/// across the inner fetch.
pub struct CachingFetcher {
    inner: Arc<dyn Fetcher>,
    pages: Mutex<HashMap<String, String>>,
}

impl CachingFetcher {
    #[must_use]
    pub fn new(inner: Arc<dyn Fetcher>) -> Self {
        Self {
            inner,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached page.
    pub fn clear(&self) {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, url: &str) -> Option<String> {
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

#[async_trait]
impl Fetcher for CachingFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError> {
        if let Some(body) = self.cached(url) {
            tracing::trace!(url, "page cache hit");
            return Ok(body);
        }

        let body = self.inner.fetch(url, timeout).await?;
        self.pages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned(), body.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{StaticFetcher, StaticReply};

    const URL: &str = "https://www.target.com/p/widget/-/A-1";

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let fixture = Arc::new(StaticFetcher::new().with_page(URL, "<html>widget</html>"));
        let cache = CachingFetcher::new(fixture.clone());

        let first = cache.fetch(URL, Duration::from_secs(1)).await.unwrap();
        let second = cache.fetch(URL, Duration::from_secs(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fixture.calls(URL), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fixture = Arc::new(StaticFetcher::new().with_reply(URL, StaticReply::Status(503)));
        let cache = CachingFetcher::new(fixture.clone());

        assert!(cache.fetch(URL, Duration::from_secs(1)).await.is_err());
        assert!(cache.fetch(URL, Duration::from_secs(1)).await.is_err());
        assert_eq!(fixture.calls(URL), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn clear_forces_refetch() {
        let fixture = Arc::new(StaticFetcher::new().with_page(URL, "body"));
        let cache = CachingFetcher::new(fixture.clone());

        cache.fetch(URL, Duration::from_secs(1)).await.unwrap();
        cache.clear();
        cache.fetch(URL, Duration::from_secs(1)).await.unwrap();
        assert_eq!(fixture.calls(URL), 2);
    }
}
