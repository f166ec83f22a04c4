#[cfg(test)]
mod tests;

use std::fmt::Write;

use super::state::LearningState;
use crate::database::sqlite::{InteractionRecord, LearningStatistics};

/// How many query records and interactions the detail dump lists
pub const DETAIL_WINDOW: usize = 10;

pub const NO_LEARNING_DATA_MESSAGE: &str =
    "No learning data file found yet. Start researching to build learning data!";

pub fn render_summary(statistics: &LearningStatistics) -> String {
    format!(
        "Learning Analysis:\n\
         - Total Interactions: {}\n\
         - Average Success Rating: {:.2}\n\
         - Total Searches Performed: {}\n\
         - Average Search Relevance: {:.2}\n",
        statistics.total_interactions,
        statistics.average_success_rating,
        statistics.total_searches,
        statistics.average_relevance
    )
}

/// Recent query records, the reliability table and recent interactions.
/// `interactions` is expected newest first.
pub fn render_detail(state: &LearningState, interactions: &[InteractionRecord]) -> String {
    let mut output = String::from("=== LEARNING DATA ===\n\n");

    output.push_str("Recent Successful Queries:\n");
    for (index, record) in state.recent_queries(DETAIL_WINDOW).iter().enumerate() {
        let _ = write!(
            output,
            "{}. Query: {}\n   Timestamp: {}\n   Results Count: {}\n\n",
            index + 1,
            record.query,
            record.formatted_timestamp(),
            record.results_count
        );
    }

    output.push_str("\nSource Reliability Scores:\n");
    for (source, score) in &state.source_reliability {
        let _ = writeln!(output, "- {}: {:.2}", source, score);
    }

    output.push_str("\nRecent Interactions:\n");
    for (index, interaction) in interactions.iter().take(DETAIL_WINDOW).enumerate() {
        let _ = writeln!(
            output,
            "{}. {} ({})",
            index + 1,
            interaction.query,
            interaction.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }

    output
}
