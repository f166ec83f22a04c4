#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;
use url::Url;

use super::http::{build_agent, get_text};
use super::{BackendError, SearchBackend, SearchCandidate};
use crate::config::DuckDuckGoConfig;

/// Source identifier stored with every DuckDuckGo candidate
pub const DUCKDUCKGO_SOURCE: &str = "DuckDuckGo";

/// Provisional relevance of the aggregated DuckDuckGo answer
pub const DUCKDUCKGO_RELEVANCE: f64 = 0.8;

/// General web search through the DuckDuckGo instant answer API.
///
/// The abstract and related topics are folded into a single aggregated
/// candidate, so one call yields at most one result.
#[derive(Debug, Clone)]
pub struct DuckDuckGoBackend {
    agent: Agent,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn collect_texts<'a>(&'a self, texts: &mut Vec<&'a str>) {
        match self {
            Self::Topic { text } => texts.push(text),
            Self::Group { topics } => {
                for topic in topics {
                    topic.collect_texts(texts);
                }
            }
        }
    }
}

impl DuckDuckGoBackend {
    #[inline]
    pub fn new(config: &DuckDuckGoConfig, timeout: Duration, user_agent: &str) -> Self {
        Self {
            agent: build_agent(timeout, user_agent),
            api_url: config.api_url.clone(),
        }
    }

    fn request_url(&self, query: &str) -> Result<Url, BackendError> {
        Url::parse_with_params(
            &self.api_url,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| BackendError::Transport(format!("invalid API URL {}: {}", self.api_url, e)))
    }

    fn fetch(&self, query: &str, count: usize) -> Result<Vec<SearchCandidate>, BackendError> {
        let url = self.request_url(query)?;
        let body = get_text(&self.agent, url.as_str())?;
        let answer: InstantAnswer =
            serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))?;

        Ok(aggregate_answer(&answer, count)
            .map(|content| SearchCandidate::new(content, DUCKDUCKGO_SOURCE, DUCKDUCKGO_RELEVANCE))
            .into_iter()
            .collect())
    }
}

/// Fold the abstract and up to `count` related topics into one text block
fn aggregate_answer(answer: &InstantAnswer, count: usize) -> Option<String> {
    let mut parts = Vec::new();

    let abstract_text = answer.abstract_text.trim();
    if !abstract_text.is_empty() {
        let heading = answer.heading.trim();
        if heading.is_empty() {
            parts.push(abstract_text.to_string());
        } else {
            parts.push(format!("{}: {}", heading, abstract_text));
        }
    }

    let mut related = Vec::new();
    for topic in &answer.related_topics {
        topic.collect_texts(&mut related);
    }
    parts.extend(
        related
            .into_iter()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .take(count)
            .map(str::to_string),
    );

    if parts.is_empty() {
        debug!("DuckDuckGo answer had no usable text");
        None
    } else {
        Some(parts.join("\n"))
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn name(&self) -> &str {
        DUCKDUCKGO_SOURCE
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
