#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! MCP server round trips over an in-memory transport

use adaptive_research::config::{Config, WikipediaConfig};
use adaptive_research::learning::LearningService;
use adaptive_research::mcp::{ConnectionState, build_research_server};
use adaptive_research::retriever::Retriever;
use adaptive_research::wikipedia::WikipediaClient;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Client<R, W> {
    lines: tokio::io::Lines<BufReader<R>>,
    writer: W,
}

impl<R, W> Client<R, W>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    async fn send(&mut self, message: Value) {
        let mut line = message.to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write request");
        self.writer.flush().await.expect("flush request");
    }

    async fn request(&mut self, message: Value) -> Value {
        self.send(message).await;
        let line = self
            .lines
            .next_line()
            .await
            .expect("read response")
            .expect("server replied");
        serde_json::from_str(&line).expect("response is JSON")
    }
}

async fn wikipedia_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("list", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"query": {"search": [{"title": "Ferris"}]}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("prop", "extracts"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"query": {"pages": {"7": {"title": "Ferris", "extract": "Ferris is a crab."}}}}"#,
        ))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn full_session_over_duplex_transport() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let wiki_server = wikipedia_mock().await;

    let service = Arc::new(
        LearningService::open_with_retriever(
            Config::with_base_dir(temp_dir.path()),
            Retriever::new(Duration::from_secs(1)),
        )
        .await
        .expect("service should open"),
    );
    let wikipedia = Arc::new(WikipediaClient::new(
        &WikipediaConfig {
            api_url: format!("{}/w/api.php", wiki_server.uri()),
            ..WikipediaConfig::default()
        },
        Duration::from_secs(5),
        "adaptive-research-tests",
    ));
    let server = Arc::new(
        build_research_server(&service, &wikipedia)
            .await
            .expect("server should build"),
    );

    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_stream);
    let serving = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve(BufReader::new(server_read), server_write).await })
    };

    let (client_read, client_write) = tokio::io::split(client_stream);
    let mut client = Client {
        lines: BufReader::new(client_read).lines(),
        writer: client_write,
    };

    let init = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "integration", "version": "1.0"}
            }
        }))
        .await;
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    client
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;

    let search = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "enhanced_search", "arguments": {"query": "offline"}}
        }))
        .await;
    assert_eq!(search["id"], 2);
    assert_eq!(search["result"]["content"][0]["text"], "No search results found.");

    let wiki = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "wikipedia", "arguments": {"query": "ferris"}}
        }))
        .await;
    assert_eq!(
        wiki["result"]["content"][0]["text"],
        "Page: Ferris\nSummary: Ferris is a crab."
    );

    let saved = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "save_to_txt_file",
                "arguments": {"data": "Ferris is a crab.", "filename": "notes.txt"}
            }
        }))
        .await;
    let saved_text = saved["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    assert!(saved_text.starts_with("Data successfully saved to "));
    let notes = std::fs::read_to_string(temp_dir.path().join("notes.txt")).expect("notes file");
    assert!(notes.contains("Ferris is a crab."));

    let analysis = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "learning_analysis"}
        }))
        .await;
    let summary = analysis["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    assert!(summary.contains("- Total Interactions: 1\n"));
    assert!(summary.contains("- Average Success Rating: 1.00\n"));

    let view = client
        .request(json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "view_learning_data", "arguments": {}}
        }))
        .await;
    let detail = view["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    assert!(detail.contains("1. Query: offline\n"));
    assert!(detail.contains("1. Research Query ("));

    client.writer.shutdown().await.expect("close client side");
    serving
        .await
        .expect("server task should join")
        .expect("server should stop cleanly");
    assert_eq!(server.connection_state().await, ConnectionState::Closed);
}
