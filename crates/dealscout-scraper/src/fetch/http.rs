//! reqwest-backed fetch collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::Instant;

use dealscout_core::AppConfig;

use super::Fetcher;
use crate::error::ExtractionError;
use crate::rate_limit::retry_with_backoff;

const BROWSER_FALLBACK_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP fetcher over a shared, internally pooled `reqwest::Client`.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx
/// responses as typed errors. Transient errors are retried with exponential
/// backoff up to `max_retries` additional attempts; a 403 is retried once
/// with a browser-like `User-Agent` since storefront bot filters commonly
/// reject scraper agents.
///
/// The timeout handed to [`Fetcher::fetch`] covers the whole call. Each
/// attempt gets an equal share of it and backoff sleeps are held to a
/// quarter of it, so a first attempt that times out still leaves room for
/// the retry.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpFetcher {
    /// Creates an `HttpFetcher` with configured timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds a fetcher from application config.
    ///
    /// # Errors
    ///
    /// See [`HttpFetcher::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractionError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_ms,
        )
    }

    async fn fetch_once(
        &self,
        url: &str,
        timeout: Duration,
        user_agent_override: Option<&str>,
    ) -> Result<String, ExtractionError> {
        if timeout.is_zero() {
            return Err(ExtractionError::Timeout {
                url: url.to_owned(),
                timeout_ms: 0,
            });
        }
        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");

        if let Some(ua) = user_agent_override {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout {
                    url: url.to_owned(),
                    timeout_ms: timeout.as_millis(),
                }
            } else {
                ExtractionError::Http(e)
            }
        })?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return Err(ExtractionError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(ExtractionError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ExtractionError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        if looks_like_bot_challenge(&body) {
            return Err(ExtractionError::BotChallenge {
                url: url.to_owned(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError> {
        let deadline = Instant::now() + timeout;
        let per_attempt = timeout / self.max_retries.saturating_add(1);
        let max_delay = timeout / 4;
        let first = retry_with_backoff(self.max_retries, self.backoff_base_ms, max_delay, || {
            self.fetch_once(url, attempt_timeout(per_attempt, deadline), None)
        })
        .await;

        match first {
            Err(ExtractionError::UnexpectedStatus { status: 403, .. }) => {
                tracing::debug!(url, "403 with configured agent; retrying with browser profile");
                let timeout = attempt_timeout(per_attempt, deadline);
                self.fetch_once(url, timeout, Some(BROWSER_FALLBACK_UA)).await
            }
            other => other,
        }
    }
}

/// The attempt's share of the budget, or whatever is left of it.
fn attempt_timeout(per_attempt: Duration, deadline: Instant) -> Duration {
    per_attempt.min(deadline.saturating_duration_since(Instant::now()))
}

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    let has_cloudflare_banner = lowered.contains("attention required! | cloudflare");
    let has_challenge_platform = lowered.contains("/cdn-cgi/challenge-platform/");
    let has_just_a_moment = lowered.contains("just a moment...");
    let has_cookie_gate = lowered.contains("please enable cookies");
    let has_captcha_gate = lowered.contains("enter the characters you see below");
    let has_robot_check = lowered.contains("robot or human?");

    has_cloudflare_banner
        || has_challenge_platform
        || has_captcha_gate
        || has_robot_check
        || (has_just_a_moment && has_cookie_gate)
}
