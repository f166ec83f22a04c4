//! Encyclopedia lookup through the MediaWiki API


use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use crate::config::{Config, WikipediaConfig};
use crate::database::sqlite::truncate_chars;
use crate::retriever::BackendError;
use crate::retriever::http::{build_agent, get_text};

/// Returned whenever a lookup finds nothing or fails
pub const NO_WIKIPEDIA_RESULT: &str = "No good Wikipedia Search Result was found";

#[derive(Debug, Clone, PartialEq)]
pub struct WikipediaPage {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WikipediaClient {
    agent: Agent,
    config: WikipediaConfig,
}

impl WikipediaClient {
    #[inline]
    pub fn new(config: &WikipediaConfig, timeout: Duration, user_agent: &str) -> Self {
        Self {
            agent: build_agent(timeout, user_agent),
            config: config.clone(),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.wikipedia,
            Duration::from_secs(config.search.timeout_seconds),
            &config.search.user_agent,
        )
    }

    /// `Page: <title>\nSummary: <text>` for the top results, truncated to the
    /// configured length, or [`NO_WIKIPEDIA_RESULT`]
    pub async fn lookup(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(pages) if !pages.is_empty() => {
                let text = pages
                    .iter()
                    .map(|page| format!("Page: {}\nSummary: {}", page.title, page.summary))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                truncate_chars(&text, self.config.max_chars)
            }
            Ok(_) => {
                debug!("Wikipedia had no page for '{}'", query);
                NO_WIKIPEDIA_RESULT.to_string()
            }
            Err(e) => {
                warn!("Wikipedia lookup failed for '{}': {}", query, e);
                NO_WIKIPEDIA_RESULT.to_string()
            }
        }
    }

    /// Top matching pages with their introduction as plain text
    pub async fn search(&self, query: &str) -> Result<Vec<WikipediaPage>, BackendError> {
        let client = self.clone();
        let query = query.to_string();

        tokio::task::spawn_blocking(move || client.fetch_pages(&query))
            .await
            .map_err(|e| BackendError::Join(e.to_string()))?
    }

    fn fetch_pages(&self, query: &str) -> Result<Vec<WikipediaPage>, BackendError> {
        let limit = self.config.top_k_results.to_string();
        let url = self.api_url(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", &limit),
            ("format", "json"),
        ])?;
        let response: SearchResponse = parse_json(&get_text(&self.agent, url.as_str())?)?;

        let titles: Vec<String> = response
            .query
            .map(|query| query.search)
            .unwrap_or_default()
            .into_iter()
            .take(self.config.top_k_results)
            .map(|hit| hit.title)
            .collect();

        let mut pages = Vec::with_capacity(titles.len());
        for title in titles {
            match self.fetch_extract(&title) {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => debug!("Wikipedia page '{}' has no extract", title),
                Err(e) => warn!("Failed to load Wikipedia page '{}': {}", title, e),
            }
        }
        Ok(pages)
    }

    fn fetch_extract(&self, title: &str) -> Result<Option<WikipediaPage>, BackendError> {
        let url = self.api_url(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
            ("format", "json"),
        ])?;
        let response: ExtractResponse = parse_json(&get_text(&self.agent, url.as_str())?)?;

        Ok(response
            .query
            .into_iter()
            .flat_map(|query| query.pages.into_values())
            .find_map(|page| {
                let summary = page.extract?.trim().to_string();
                (!summary.is_empty()).then_some(WikipediaPage {
                    title: page.title,
                    summary,
                })
            }))
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url, BackendError> {
        Url::parse_with_params(&self.config.api_url, params).map_err(|e| {
            BackendError::Transport(format!("invalid API URL {}: {}", self.config.api_url, e))
        })
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))
}
