//! The public entry point: product details, alternatives, and verdicts.
//!
//! A [`PriceProvider`] owns one session at a time. The session holds the
//! shared fetch collaborator (the pooled HTTP client unless one was
//! injected), the per-session page cache, and the token that `close()`
//! fires to abandon in-flight calls.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dealscout_core::{
    AlternativeCandidate, AppConfig, DealReport, DealVerdict, ProductLookup, ProductRecord,
};
use dealscout_scraper::{
    AdapterRegistry, CachingFetcher, ExtractionError, ExtractionPipeline, Fetcher, HttpFetcher,
};

use crate::alternatives::{AlternativesFinder, AlternativesOptions};
use crate::analyzer::DealAnalyzer;

#[derive(Clone)]
struct Session {
    cache: Arc<CachingFetcher>,
    token: CancellationToken,
}

pub struct PriceProvider {
    config: AppConfig,
    registry: Arc<AdapterRegistry>,
    analyzer: DealAnalyzer,
    injected: Option<Arc<dyn Fetcher>>,
    session: Mutex<Option<Session>>,
}

impl PriceProvider {
    /// Provider backed by the HTTP fetcher described by `config`. Nothing
    /// is opened until the first call.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self::build(config, None)
    }

    /// Provider backed by a caller-supplied fetch collaborator, for fixtures
    /// and offline replays.
    #[must_use]
    pub fn with_fetcher(config: AppConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::build(config, Some(fetcher))
    }

    fn build(config: AppConfig, injected: Option<Arc<dyn Fetcher>>) -> Self {
        let analyzer = DealAnalyzer::new(config.weights.clone());
        Self {
            config,
            registry: Arc::new(AdapterRegistry::default()),
            analyzer,
            injected,
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Opens the session if it is not already open.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Http`] if the HTTP client cannot be built.
    pub fn open(&self) -> Result<(), ExtractionError> {
        self.session().map(|_| ())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cancels in-flight calls, drops the fetcher, and clears the page
    /// cache. Safe to call any number of times; the next call reopens.
    pub fn close(&self) {
        let closed = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(session) = closed {
            session.token.cancel();
            session.cache.clear();
            tracing::debug!("provider session closed");
        }
    }

    /// Extracts a product record for `url`. Never fails: problems come back
    /// as an error-status lookup.
    pub async fn get_product_details(&self, url: &str) -> ProductLookup {
        match self.session() {
            Ok(session) => self.lookup(&session, url, &session.token).await,
            Err(e) => ProductLookup::Error {
                url: url.to_owned(),
                message: e.to_string(),
            },
        }
    }

    /// Ranked offers for the same product at other retailers.
    pub async fn find_alternatives(&self, record: &ProductRecord) -> Vec<AlternativeCandidate> {
        match self.session() {
            Ok(session) => self.alternatives(&session, record, &session.token).await,
            Err(e) => {
                tracing::warn!(error = %e, "provider unavailable; no alternatives searched");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn analyze_deal(
        &self,
        record: &ProductRecord,
        alternatives: &[AlternativeCandidate],
    ) -> DealVerdict {
        let verdict = self.analyzer.analyze(record, alternatives);
        tracing::info!(
            url = %record.url,
            retailer = %record.source,
            holistic_score = verdict.holistic_score,
            is_good_deal = verdict.is_good_deal,
            verdict = %verdict.verdict,
            "deal verdict"
        );
        verdict
    }

    /// Runs details, alternatives, and analysis for `url` in order.
    ///
    /// When `cancel` fires (or the provider is closed) mid-run, in-flight
    /// fetches are dropped, whatever was collected is analyzed, and the
    /// report is marked `cancelled`.
    pub async fn evaluate(&self, url: &str, cancel: &CancellationToken) -> DealReport {
        let session = match self.session() {
            Ok(session) => session,
            Err(e) => {
                return DealReport {
                    product: ProductLookup::Error {
                        url: url.to_owned(),
                        message: e.to_string(),
                    },
                    alternatives: Vec::new(),
                    verdict: None,
                    cancelled: cancel.is_cancelled(),
                }
            }
        };

        let run = session.token.child_token();
        let _link = LinkedCancel::new(cancel, &run);

        let product = self.lookup(&session, url, &run).await;
        let Some(record) = product.record().cloned() else {
            return DealReport {
                product,
                alternatives: Vec::new(),
                verdict: None,
                cancelled: run.is_cancelled(),
            };
        };

        let alternatives = if run.is_cancelled() {
            Vec::new()
        } else {
            self.alternatives(&session, &record, &run).await
        };
        let verdict = self.analyze_deal(&record, &alternatives);

        DealReport {
            product,
            alternatives,
            verdict: Some(verdict),
            cancelled: run.is_cancelled(),
        }
    }

    fn session(&self) -> Result<Session, ExtractionError> {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let inner: Arc<dyn Fetcher> = match &self.injected {
            Some(fetcher) => Arc::clone(fetcher),
            None => Arc::new(HttpFetcher::from_config(&self.config)?),
        };
        let session = Session {
            cache: Arc::new(CachingFetcher::new(inner)),
            token: CancellationToken::new(),
        };
        *guard = Some(session.clone());
        tracing::debug!(injected = self.injected.is_some(), "provider session opened");
        Ok(session)
    }

    async fn lookup(
        &self,
        session: &Session,
        url: &str,
        cancel: &CancellationToken,
    ) -> ProductLookup {
        let fetcher: Arc<dyn Fetcher> = session.cache.clone();
        let pipeline = ExtractionPipeline::new(
            Arc::clone(&self.registry),
            fetcher,
            self.config.adapter_timeout(),
        );
        pipeline.extract(url, cancel).await.lookup
    }

    async fn alternatives(
        &self,
        session: &Session,
        record: &ProductRecord,
        cancel: &CancellationToken,
    ) -> Vec<AlternativeCandidate> {
        let fetcher: Arc<dyn Fetcher> = session.cache.clone();
        let finder = AlternativesFinder::new(
            Arc::clone(&self.registry),
            fetcher,
            self.config.weights.clone(),
            AlternativesOptions::from_config(&self.config),
        );
        finder.find(record, cancel).await
    }
}

/// Forwards a caller's cancellation into a run token for as long as the
/// guard lives.
struct LinkedCancel {
    watcher: JoinHandle<()>,
}

impl LinkedCancel {
    fn new(caller: &CancellationToken, run: &CancellationToken) -> Self {
        if caller.is_cancelled() {
            run.cancel();
        }
        let caller = caller.clone();
        let run = run.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                () = caller.cancelled() => run.cancel(),
                () = run.cancelled() => {}
            }
        });
        Self { watcher }
    }
}

impl Drop for LinkedCancel {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
