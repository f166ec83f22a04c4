#[cfg(test)]
mod tests;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Longest content snippet kept per search effectiveness record
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Longest response text kept per interaction record
pub const MAX_RESPONSE_CHARS: usize = 1000;

/// Tools descriptor written when the caller does not name the tools it used
pub const DEFAULT_TOOLS_USED: &str = "ai_tools";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InteractionRecord {
    pub id: i64,
    pub query: String,
    pub response: String,
    pub tools_used: String,
    pub success_rating: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInteraction {
    pub query: String,
    pub response: String,
    pub tools_used: String,
    pub success_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SearchEffectivenessRecord {
    pub id: i64,
    pub search_query: String,
    pub source_url: String,
    pub content_snippet: String,
    pub relevance_score: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSearchEffectiveness {
    pub search_query: String,
    pub source_url: String,
    pub content_snippet: String,
    pub relevance_score: f64,
}

/// The four scalar aggregates behind the analytics summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningStatistics {
    pub total_interactions: i64,
    pub average_success_rating: f64,
    pub total_searches: i64,
    pub average_relevance: f64,
}

impl NewInteraction {
    /// Build an interaction row, truncating the response and clamping the rating
    #[inline]
    pub fn new(
        query: impl Into<String>,
        response: &str,
        tools_used: impl Into<String>,
        success_rating: f64,
    ) -> Self {
        Self {
            query: query.into(),
            response: truncate_chars(response, MAX_RESPONSE_CHARS),
            tools_used: tools_used.into(),
            success_rating: clamp_unit(success_rating),
        }
    }

    /// Pass/fail interaction with the default tools descriptor
    #[inline]
    pub fn from_outcome(query: impl Into<String>, response: &str, success: bool) -> Self {
        Self::new(
            query,
            response,
            DEFAULT_TOOLS_USED,
            if success { 1.0 } else { 0.0 },
        )
    }
}

impl NewSearchEffectiveness {
    #[inline]
    pub fn new(
        search_query: impl Into<String>,
        source_url: impl Into<String>,
        content: &str,
        relevance_score: f64,
    ) -> Self {
        Self {
            search_query: search_query.into(),
            source_url: source_url.into(),
            content_snippet: truncate_chars(content, MAX_SNIPPET_CHARS),
            relevance_score: clamp_unit(relevance_score),
        }
    }
}

/// Current local time at second precision, the resolution every record uses
#[inline]
pub fn record_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Clamp a score into [0, 1]; NaN collapses to 0
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Keep at most `max_chars` characters without splitting a code point
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text.get(..byte_index).unwrap_or(text).to_string(),
        None => text.to_string(),
    }
}
