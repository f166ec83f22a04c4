//! MCP (Model Context Protocol) tool server
//!
//! Exposes the research tools to an external agent over JSON-RPC 2.0 on stdio.


pub mod protocol;
pub mod server;
pub mod tools;
pub mod validation;

use anyhow::Result;
use std::sync::Arc;

use crate::learning::LearningService;
use crate::wikipedia::WikipediaClient;

pub use server::{ConnectionState, McpServer, ToolHandler};

const SERVER_INSTRUCTIONS: &str = "Research assistant tools. Use enhanced_search for web searches; \
results are ranked by learned source reliability. Call record_interaction after answering.";

/// Server with every research tool registered
pub async fn build_research_server(
    service: &Arc<LearningService>,
    wikipedia: &Arc<WikipediaClient>,
) -> Result<McpServer> {
    let server = McpServer::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?
        .with_instructions(SERVER_INSTRUCTIONS);
    tools::register_research_tools(&server, service, wikipedia).await?;
    Ok(server)
}
