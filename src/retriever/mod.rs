//! Multi-strategy retrieval
//!
//! Every configured [`SearchBackend`] receives the same query concurrently.
//! Each call is bounded by a timeout and reported individually, so a failing
//! backend only removes its own candidates from the search.

pub mod duckduckgo;
pub(crate) mod http;
pub mod page_scraper;


use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::database::sqlite::clamp_unit;

pub use self::duckduckgo::DuckDuckGoBackend;
pub use self::page_scraper::PageScraperBackend;

/// A single result produced by one backend, before ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    content: String,
    source: String,
    relevance: f64,
}

impl SearchCandidate {
    /// Relevance is clamped to [0, 1]; NaN becomes 0
    #[inline]
    pub fn new(content: impl Into<String>, source: impl Into<String>, relevance: f64) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            relevance: clamp_unit(relevance),
        }
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Provisional relevance assigned by the backend
    #[inline]
    pub fn relevance(&self) -> f64 {
        self.relevance
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error {0}")]
    Http(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("invalid CSS selector: {0}")]
    InvalidSelector(String),
    #[error("all {0} result pages failed")]
    Exhausted(usize),
    #[error("backend task failed: {0}")]
    Join(String),
}

/// A retrieval strategy that turns a query into candidates
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Identifier used for logging and diagnostics
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchCandidate>, BackendError>;
}

/// Outcome of one backend call within a search
#[derive(Debug)]
pub struct BackendReport {
    pub backend: String,
    pub outcome: Result<Vec<SearchCandidate>, BackendError>,
    pub elapsed: Duration,
}

impl BackendReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    #[inline]
    pub fn candidate_count(&self) -> usize {
        self.outcome.as_ref().map_or(0, Vec::len)
    }
}

/// Per-backend reports for one query, in backend registration order
#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub reports: Vec<BackendReport>,
}

impl RetrievalOutcome {
    /// Concatenation of every successful backend's candidates
    #[inline]
    pub fn candidates(&self) -> Vec<SearchCandidate> {
        self.reports
            .iter()
            .filter_map(|report| report.outcome.as_ref().ok())
            .flatten()
            .cloned()
            .collect()
    }

    /// True when no backend produced a usable response
    #[inline]
    pub fn all_failed(&self) -> bool {
        !self.reports.iter().any(BackendReport::is_success)
    }

    #[inline]
    pub fn failures(&self) -> impl Iterator<Item = (&str, &BackendError)> {
        self.reports.iter().filter_map(|report| {
            report
                .outcome
                .as_ref()
                .err()
                .map(|error| (report.backend.as_str(), error))
        })
    }
}

/// Fans a query out to every registered backend
#[derive(Clone)]
pub struct Retriever {
    backends: Vec<Arc<dyn SearchBackend>>,
    timeout: Duration,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("backends", &self.backend_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Retriever {
    #[inline]
    pub fn new(timeout: Duration) -> Self {
        Self {
            backends: Vec::new(),
            timeout,
        }
    }

    /// Retriever with every backend enabled in the configuration
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.search.timeout_seconds);
        let mut retriever = Self::new(timeout);

        if config.duckduckgo.enabled {
            retriever = retriever.with_backend(DuckDuckGoBackend::new(
                &config.duckduckgo,
                timeout,
                &config.search.user_agent,
            ));
        }

        if config.scraper.enabled && !config.scraper.engines.is_empty() {
            retriever = retriever.with_backend(PageScraperBackend::new(
                &config.scraper,
                timeout,
                &config.search.user_agent,
            ));
        }

        retriever
    }

    #[inline]
    #[must_use]
    pub fn with_backend<B>(mut self, backend: B) -> Self
    where
        B: SearchBackend + 'static,
    {
        self.backends.push(Arc::new(backend));
        self
    }

    #[inline]
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query every backend concurrently and collect one report per backend
    pub async fn retrieve(&self, query: &str, count: usize) -> RetrievalOutcome {
        let calls = self.backends.iter().map(|backend| async move {
            let started = Instant::now();
            let outcome = tokio::time::timeout(self.timeout, backend.search(query, count))
                .await
                .unwrap_or_else(|_| Err(BackendError::Timeout(self.timeout)));

            match &outcome {
                Ok(candidates) => debug!(
                    "Backend {} returned {} candidates for '{}'",
                    backend.name(),
                    candidates.len(),
                    query
                ),
                Err(e) => warn!("Backend {} failed for '{}': {}", backend.name(), query, e),
            }

            BackendReport {
                backend: backend.name().to_string(),
                outcome,
                elapsed: started.elapsed(),
            }
        });

        RetrievalOutcome {
            reports: join_all(calls).await,
        }
    }
}
