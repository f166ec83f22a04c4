
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;

use super::http::{build_agent, get_text};
use super::{BackendError, SearchBackend, SearchCandidate};
use crate::config::{ScraperConfig, SearchEngineConfig};

/// Source identifier stored with every scraped candidate
pub const SCRAPER_SOURCE: &str = "Custom Search";

/// Provisional relevance of each scraped result
pub const SCRAPER_RELEVANCE: f64 = 0.7;

/// Scrapes search engine result pages, trying each engine in order and
/// stopping at the first page that loads
#[derive(Debug, Clone)]
pub struct PageScraperBackend {
    agent: Agent,
    engines: Vec<SearchEngineConfig>,
    max_results_per_page: usize,
    engine_timeout: Duration,
}

impl PageScraperBackend {
    /// `timeout` bounds the whole backend; each engine gets an equal share
    /// so a hanging engine still leaves time for the next one
    #[inline]
    pub fn new(config: &ScraperConfig, timeout: Duration, user_agent: &str) -> Self {
        let engine_timeout = per_engine_timeout(timeout, config.engines.len());
        Self {
            agent: build_agent(engine_timeout, user_agent),
            engines: config.engines.clone(),
            max_results_per_page: config.max_results_per_page,
            engine_timeout,
        }
    }

    #[inline]
    pub fn engine_timeout(&self) -> Duration {
        self.engine_timeout
    }

    fn fetch(&self, query: &str, count: usize) -> Result<Vec<SearchCandidate>, BackendError> {
        for engine in &self.engines {
            let url = engine.render_url(query, count);

            match get_text(&self.agent, &url) {
                Ok(html) => {
                    let candidates = parse_result_page(&html, engine, self.max_results_per_page)?;
                    debug!(
                        "Engine {} yielded {} results for '{}'",
                        engine.name,
                        candidates.len(),
                        query
                    );
                    return Ok(candidates);
                }
                Err(e) => {
                    warn!("Engine {} failed for '{}': {}", engine.name, query, e);
                }
            }
        }

        Err(BackendError::Exhausted(self.engines.len()))
    }
}

/// Request budget for one engine out of the backend's total `timeout`
pub fn per_engine_timeout(timeout: Duration, engines: usize) -> Duration {
    match u32::try_from(engines) {
        Ok(0) => timeout,
        Ok(engines) => timeout / engines,
        Err(_) => timeout / u32::MAX,
    }
}

/// Parse up to `max_results` result blocks; blocks without a title or a
/// snippet are skipped without affecting their siblings
pub fn parse_result_page(
    html: &str,
    engine: &SearchEngineConfig,
    max_results: usize,
) -> Result<Vec<SearchCandidate>, BackendError> {
    let result_selector = parse_selector(&engine.result_selector)?;
    let title_selector = parse_selector(&engine.title_selector)?;
    let snippet_selector = parse_selector(&engine.snippet_selector)?;

    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    for (index, block) in document.select(&result_selector).take(max_results).enumerate() {
        let title = first_text(block, &title_selector);
        let snippet = first_text(block, &snippet_selector);

        match (title, snippet) {
            (Some(title), Some(snippet)) => {
                candidates.push(SearchCandidate::new(
                    format!("{}: {}", title, snippet),
                    SCRAPER_SOURCE,
                    SCRAPER_RELEVANCE,
                ));
            }
            _ => debug!(
                "Skipping result block {} on {}: missing title or snippet",
                index, engine.name
            ),
        }
    }

    Ok(candidates)
}

fn parse_selector(selector: &str) -> Result<Selector, BackendError> {
    Selector::parse(selector).map_err(|_| BackendError::InvalidSelector(selector.to_string()))
}

/// Whitespace-normalised text of the first matching descendant
fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let found = element.select(selector).next()?;
    let text = found.text().collect::<String>();
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!normalized.is_empty()).then_some(normalized)
}

#[async_trait]
impl SearchBackend for PageScraperBackend {
    fn name(&self) -> &str {
        SCRAPER_SOURCE
    }

    async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchCandidate>, BackendError> {
        let backend = self.clone();
        let query = query.to_string();

        tokio::task::spawn_blocking(move || backend.fetch(&query, count))
            .await
            .map_err(|e| BackendError::Join(e.to_string()))?
    }
}
