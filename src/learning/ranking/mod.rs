#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::state::LearningState;
use crate::database::sqlite::clamp_unit;
use crate::retriever::SearchCandidate;

/// Text returned when a search produced no ranked results
pub const NO_RESULTS_MESSAGE: &str = "No search results found.";

/// A candidate after blending with its source's learned reliability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub content: String,
    pub source: String,
    pub provisional_relevance: f64,
    pub final_relevance: f64,
}

/// Average of the backend's provisional score and the source reliability
#[inline]
pub fn blend(provisional: f64, reliability: f64) -> f64 {
    clamp_unit((provisional + reliability) / 2.0)
}

/// Rescore every candidate and sort by final relevance, highest first.
/// Equal scores keep their retrieval order.
pub fn rank_candidates(candidates: Vec<SearchCandidate>, state: &LearningState) -> Vec<RankedResult> {
    let mut ranked: Vec<RankedResult> = candidates
        .into_iter()
        .map(|candidate| {
            let reliability = state.reliability(candidate.source());
            RankedResult {
                content: candidate.content().to_string(),
                source: candidate.source().to_string(),
                provisional_relevance: candidate.relevance(),
                final_relevance: blend(candidate.relevance(), reliability),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.final_relevance.total_cmp(&a.final_relevance));
    ranked
}

/// Numbered listing of the first `count` results
pub fn format_results(ranked: &[RankedResult], count: usize) -> String {
    if ranked.is_empty() || count == 0 {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut output = String::from("Search Results:\n");
    for (index, result) in ranked.iter().take(count).enumerate() {
        let _ = write!(
            output,
            "\n{}. {}\n   Source: {} (Relevance: {:.2})\n",
            index + 1,
            result.content,
            result.source,
            result.final_relevance
        );
    }
    output
}
