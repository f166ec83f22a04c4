use super::*;

#[test]
fn interaction_truncates_response() {
    let long_response = "x".repeat(MAX_RESPONSE_CHARS + 250);
    let interaction = NewInteraction::new("query", &long_response, "save_tool", 1.0);

    assert_eq!(interaction.response.chars().count(), MAX_RESPONSE_CHARS);
    assert_eq!(interaction.tools_used, "save_tool");
}

#[test]
fn interaction_from_outcome() {
    let success = NewInteraction::from_outcome("q", "answer", true);
    assert!((success.success_rating - 1.0).abs() < f64::EPSILON);
    assert_eq!(success.tools_used, DEFAULT_TOOLS_USED);

    let failure = NewInteraction::from_outcome("q", "Error: boom", false);
    assert!(failure.success_rating.abs() < f64::EPSILON);
}

#[test]
fn interaction_rating_is_clamped() {
    assert!((NewInteraction::new("q", "r", "t", 3.0).success_rating - 1.0).abs() < f64::EPSILON);
    assert!(NewInteraction::new("q", "r", "t", -1.0).success_rating.abs() < f64::EPSILON);
    assert!(NewInteraction::new("q", "r", "t", f64::NAN).success_rating.abs() < f64::EPSILON);
}

#[test]
fn search_effectiveness_truncates_snippet() {
    let content = "é".repeat(MAX_SNIPPET_CHARS * 2);
    let record = NewSearchEffectiveness::new("query", "DuckDuckGo", &content, 0.65);

    assert_eq!(record.content_snippet.chars().count(), MAX_SNIPPET_CHARS);
    assert!((record.relevance_score - 0.65).abs() < f64::EPSILON);
}

#[test]
fn truncate_chars_handles_short_input() {
    assert_eq!(truncate_chars("short", 500), "short");
    assert_eq!(truncate_chars("", 10), "");
    assert_eq!(truncate_chars("abcdef", 3), "abc");
    assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
}

#[test]
fn record_timestamp_has_second_precision() {
    let timestamp = record_timestamp();
    assert_eq!(timestamp.nanosecond(), 0);
}
