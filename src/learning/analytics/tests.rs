use super::*;
use crate::learning::state::QueryRecord;
use chrono::{NaiveDate, NaiveDateTime};

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 17)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid timestamp")
}

fn interaction(id: i64, query: &str, timestamp: NaiveDateTime) -> InteractionRecord {
    InteractionRecord {
        id,
        query: query.to_string(),
        response: "response".to_string(),
        tools_used: "ai_tools".to_string(),
        success_rating: 1.0,
        timestamp,
    }
}

#[test]
fn summary_layout() {
    let statistics = LearningStatistics {
        total_interactions: 3,
        average_success_rating: 2.0 / 3.0,
        total_searches: 7,
        average_relevance: 0.6125,
    };

    assert_eq!(
        render_summary(&statistics),
        "Learning Analysis:\n\
         - Total Interactions: 3\n\
         - Average Success Rating: 0.67\n\
         - Total Searches Performed: 7\n\
         - Average Search Relevance: 0.61\n"
    );
}

#[test]
fn summary_of_empty_store() {
    let statistics = LearningStatistics {
        total_interactions: 0,
        average_success_rating: 0.0,
        total_searches: 0,
        average_relevance: 0.0,
    };
    let summary = render_summary(&statistics);
    assert!(summary.contains("- Total Interactions: 0\n"));
    assert!(summary.contains("- Average Search Relevance: 0.00\n"));
}

#[test]
fn detail_layout() {
    let mut state = LearningState::default();
    state.record_query(QueryRecord {
        query: "rust async".to_string(),
        timestamp: at(9, 15),
        results_count: 3,
    });
    state.source_reliability.insert("DuckDuckGo".to_string(), 0.575);
    state.source_reliability.insert("Custom Search".to_string(), 0.55);

    let detail = render_detail(
        &state,
        &[
            interaction(2, "second question", at(10, 0)),
            interaction(1, "first question", at(9, 0)),
        ],
    );

    assert_eq!(
        detail,
        "=== LEARNING DATA ===\n\n\
         Recent Successful Queries:\n\
         1. Query: rust async\n   Timestamp: 2024-05-17 09:15:00\n   Results Count: 3\n\n\
         \nSource Reliability Scores:\n\
         - Custom Search: 0.55\n\
         - DuckDuckGo: 0.57\n\
         \nRecent Interactions:\n\
         1. second question (2024-05-17 10:00:00)\n\
         2. first question (2024-05-17 09:00:00)\n"
    );
}

#[test]
fn detail_lists_only_the_last_window() {
    let mut state = LearningState::default();
    for index in 0..25 {
        state.record_query(QueryRecord {
            query: format!("query {}", index),
            timestamp: at(8, 0),
            results_count: 1,
        });
    }
    let interactions: Vec<_> = (0..25)
        .map(|index| interaction(index, &format!("interaction {}", index), at(8, 0)))
        .collect();

    let detail = render_detail(&state, &interactions);
    assert!(detail.contains("1. Query: query 15\n"));
    assert!(detail.contains("10. Query: query 24\n"));
    assert!(!detail.contains("query 14\n"));
    assert!(detail.contains("10. interaction 9 ("));
    assert!(!detail.contains("interaction 10 ("));
}
