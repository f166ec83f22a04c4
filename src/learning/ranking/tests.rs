use super::*;

fn ranked(content: &str, source: &str, final_relevance: f64) -> RankedResult {
    RankedResult {
        content: content.to_string(),
        source: source.to_string(),
        provisional_relevance: final_relevance,
        final_relevance,
    }
}

#[test]
fn fresh_source_blends_with_neutral_prior() {
    let state = LearningState::default();
    let results = rank_candidates(vec![SearchCandidate::new("answer", "A", 0.8)], &state);

    assert_eq!(results.len(), 1);
    assert!((results[0].final_relevance - 0.65).abs() < 1e-9);
    assert!((results[0].provisional_relevance - 0.8).abs() < 1e-9);
}

#[test]
fn learned_reliability_reorders_results() {
    let mut state = LearningState::default();
    state.source_reliability.insert("trusted".to_string(), 1.0);
    state.source_reliability.insert("flaky".to_string(), 0.0);

    let results = rank_candidates(
        vec![
            SearchCandidate::new("from flaky", "flaky", 0.8),
            SearchCandidate::new("from trusted", "trusted", 0.7),
        ],
        &state,
    );

    assert_eq!(results[0].content, "from trusted");
    assert!((results[0].final_relevance - 0.85).abs() < 1e-9);
    assert!((results[1].final_relevance - 0.4).abs() < 1e-9);
}

#[test]
fn equal_scores_keep_retrieval_order() {
    let state = LearningState::default();
    let results = rank_candidates(
        vec![
            SearchCandidate::new("first", "B", 0.7),
            SearchCandidate::new("higher", "A", 0.8),
            SearchCandidate::new("second", "B", 0.7),
            SearchCandidate::new("third", "B", 0.7),
        ],
        &state,
    );

    let order: Vec<_> = results.iter().map(|result| result.content.as_str()).collect();
    assert_eq!(order, vec!["higher", "first", "second", "third"]);
}

#[test]
fn final_relevance_stays_in_unit_interval() {
    let mut state = LearningState::default();
    state.source_reliability.insert("A".to_string(), 1.0);

    let results = rank_candidates(
        vec![
            SearchCandidate::new("max", "A", 5.0),
            SearchCandidate::new("min", "B", -5.0),
        ],
        &state,
    );
    for result in results {
        assert!((0.0..=1.0).contains(&result.final_relevance));
    }
}

#[test]
fn format_empty_results() {
    assert_eq!(format_results(&[], 5), NO_RESULTS_MESSAGE);
    assert_eq!(format_results(&[ranked("x", "A", 0.5)], 0), NO_RESULTS_MESSAGE);
}

#[test]
fn format_numbered_listing() {
    let results = vec![
        ranked("Rust is fast.", "DuckDuckGo", 0.65),
        ranked("The Rust Book: Learn Rust.", "Custom Search", 0.6),
    ];

    assert_eq!(
        format_results(&results, 5),
        "Search Results:\n\
         \n1. Rust is fast.\n   Source: DuckDuckGo (Relevance: 0.65)\n\
         \n2. The Rust Book: Learn Rust.\n   Source: Custom Search (Relevance: 0.60)\n"
    );
}

#[test]
fn format_truncates_to_count() {
    let results = vec![
        ranked("one", "A", 0.9),
        ranked("two", "A", 0.8),
        ranked("three", "A", 0.7),
    ];

    let text = format_results(&results, 2);
    assert!(text.contains("2. two"));
    assert!(!text.contains("three"));
}
