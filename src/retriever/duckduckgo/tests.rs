use super::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> DuckDuckGoBackend {
    let config = DuckDuckGoConfig {
        enabled: true,
        api_url: format!("{}/", server.uri()),
    };
    DuckDuckGoBackend::new(&config, Duration::from_secs(5), "adaptive-research-tests")
}

#[test]
fn aggregate_answer_combines_abstract_and_topics() {
    let answer: InstantAnswer = serde_json::from_str(
        r#"{
            "Heading": "Rust (programming language)",
            "AbstractText": "Rust is a general-purpose programming language.",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager", "FirstURL": "https://example.com/cargo"},
                {"Name": "Tools", "Topics": [
                    {"Text": "Clippy - a collection of lints"},
                    {"Text": "Rustfmt - a formatter"}
                ]},
                {"Text": "Ferris - the unofficial mascot"}
            ]
        }"#,
    )
    .expect("fixture should parse");

    let content = aggregate_answer(&answer, 2).expect("answer should aggregate");
    assert_eq!(
        content,
        "Rust (programming language): Rust is a general-purpose programming language.\n\
         Cargo - the Rust package manager\n\
         Clippy - a collection of lints"
    );
}

#[test]
fn aggregate_answer_empty_response() {
    let answer: InstantAnswer =
        serde_json::from_str(r#"{"AbstractText": "", "RelatedTopics": []}"#)
            .expect("fixture should parse");
    assert!(aggregate_answer(&answer, 5).is_none());

    let answer: InstantAnswer = serde_json::from_str("{}").expect("fixture should parse");
    assert!(aggregate_answer(&answer, 5).is_none());
}

#[tokio::test]
async fn search_returns_single_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "rust language"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"AbstractText": "Rust is fast.", "RelatedTopics": [{"Text": "Memory safety"}]}"#,
        ))
        .mount(&server)
        .await;

    let candidates = backend_for(&server)
        .search("rust language", 5)
        .await
        .expect("search should succeed");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].content(), "Rust is fast.\nMemory safety");
    assert_eq!(candidates[0].source(), DUCKDUCKGO_SOURCE);
    assert!((candidates[0].relevance() - DUCKDUCKGO_RELEVANCE).abs() < f64::EPSILON);
}

#[tokio::test]
async fn search_without_text_yields_no_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"AbstractText": ""}"#))
        .mount(&server)
        .await;

    let candidates = backend_for(&server)
        .search("obscure", 5)
        .await
        .expect("search should succeed");
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = backend_for(&server).search("rust", 5).await;
    assert!(matches!(result, Err(BackendError::Http(503))));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = backend_for(&server).search("rust", 5).await;
    assert!(matches!(result, Err(BackendError::Parse(_))));
}
