//! In-memory fetch collaborator for fixtures and offline replays.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::Fetcher;
use crate::error::ExtractionError;

/// Canned response for a URL or URL prefix.
#[derive(Debug, Clone)]
pub enum StaticReply {
    Page(String),
    /// Responds with the given HTTP status (404 maps to `NotFound`).
    Status(u16),
    /// Behaves like a network timeout.
    Timeout,
    /// Serves the page after sleeping, for exercising per-call budgets.
    Slow { delay: Duration, body: String },
}

/// Serves canned pages keyed by exact URL or by URL prefix.
///
/// Exact routes win over prefix routes; among prefixes the longest match
/// wins. Unknown URLs answer like a 404. Every call is counted per URL.
#[derive(Default)]
pub struct StaticFetcher {
    exact: HashMap<String, StaticReply>,
    prefixes: Vec<(String, StaticReply)>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.with_reply(url, StaticReply::Page(body.into()))
    }

    #[must_use]
    pub fn with_reply(mut self, url: &str, reply: StaticReply) -> Self {
        self.exact.insert(url.to_owned(), reply);
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: &str, reply: StaticReply) -> Self {
        self.prefixes.push((prefix.to_owned(), reply));
        self
    }

    /// How many times `url` has been requested.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Total requests across all URLs.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn route(&self, url: &str) -> Option<&StaticReply> {
        self.exact.get(url).or_else(|| {
            self.prefixes
                .iter()
                .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, reply)| reply)
        })
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_owned())
            .or_insert(0) += 1;

        match self.route(url).cloned() {
            Some(StaticReply::Page(body)) => Ok(body),
            Some(StaticReply::Status(404)) | None => Err(ExtractionError::NotFound {
                url: url.to_owned(),
            }),
            Some(StaticReply::Status(status)) => Err(ExtractionError::UnexpectedStatus {
                status,
                url: url.to_owned(),
            }),
            Some(StaticReply::Timeout) => Err(ExtractionError::Timeout {
                url: url.to_owned(),
                timeout_ms: timeout.as_millis(),
            }),
            Some(StaticReply::Slow { delay, body }) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
        }
    }
}
