//! Research tools exposed to MCP clients

use crate::learning::LearningService;
use crate::mcp::protocol::*;
use crate::mcp::server::{McpServer, ToolHandler};
use crate::output::save_research_output;
use crate::wikipedia::WikipediaClient;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Register every research tool on `server`
pub async fn register_research_tools(
    server: &McpServer,
    service: &Arc<LearningService>,
    wikipedia: &Arc<WikipediaClient>,
) -> Result<()> {
    server
        .register_tool(
            EnhancedSearchHandler::tool_definition(),
            EnhancedSearchHandler::new(Arc::clone(service)),
        )
        .await?;
    server
        .register_tool(
            WikipediaHandler::tool_definition(),
            WikipediaHandler::new(Arc::clone(wikipedia)),
        )
        .await?;
    server
        .register_tool(
            SaveOutputHandler::tool_definition(),
            SaveOutputHandler::new(Arc::clone(service)),
        )
        .await?;
    server
        .register_tool(
            RecordInteractionHandler::tool_definition(),
            RecordInteractionHandler::new(Arc::clone(service)),
        )
        .await?;
    server
        .register_tool(
            LearningAnalysisHandler::tool_definition(),
            LearningAnalysisHandler::new(Arc::clone(service)),
        )
        .await?;
    server
        .register_tool(
            ViewLearningDataHandler::tool_definition(),
            ViewLearningDataHandler::new(Arc::clone(service)),
        )
        .await?;
    Ok(())
}

fn arguments(params: CallToolParams) -> HashMap<String, Value> {
    params.arguments.unwrap_or_default()
}

fn required_str<'a>(args: &'a HashMap<String, Value>, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Missing required parameter: {}", name))
}

/// Learning-enabled web search
pub struct EnhancedSearchHandler {
    service: Arc<LearningService>,
}

impl EnhancedSearchHandler {
    #[inline]
    pub fn new(service: Arc<LearningService>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "enhanced_search".to_string(),
            description: Some(
                "Web search across several strategies, ranked by learned source reliability"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "count": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of results (default from configuration)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for EnhancedSearchHandler {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = arguments(params);
        let query = required_str(&args, "query")?;
        let count = args
            .get("count")
            .and_then(Value::as_u64)
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(self.service.config().search.result_count)
            .max(1);

        debug!("Enhanced search: query='{}', count={}", query, count);
        Ok(CallToolResult::text(
            self.service.search_text(query, count).await,
        ))
    }
}

/// Encyclopedia summary for a topic
pub struct WikipediaHandler {
    client: Arc<WikipediaClient>,
}

impl WikipediaHandler {
    #[inline]
    pub fn new(client: Arc<WikipediaClient>) -> Self {
        Self { client }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "wikipedia".to_string(),
            description: Some("Look up a topic on Wikipedia and return a short summary".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Topic to look up"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for WikipediaHandler {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = arguments(params);
        let query = required_str(&args, "query")?;
        Ok(CallToolResult::text(self.client.lookup(query).await))
    }
}

/// Appends research output to a text file and learns from the save
pub struct SaveOutputHandler {
    service: Arc<LearningService>,
}

impl SaveOutputHandler {
    #[inline]
    pub fn new(service: Arc<LearningService>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "save_to_txt_file".to_string(),
            description: Some(
                "Save structured research data to a text file and learn from the interaction"
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "string",
                        "description": "Research text to save"
                    },
                    "filename": {
                        "type": "string",
                        "description": "Optional: file name inside the data directory (default: research_output.txt)"
                    }
                },
                "required": ["data"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for SaveOutputHandler {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = arguments(params);
        let data = required_str(&args, "data")?;
        let filename = args.get("filename").and_then(Value::as_str);

        match save_research_output(&self.service, data, filename).await {
            Ok(message) => Ok(CallToolResult::text(message)),
            Err(e) => {
                error!("Failed to save research output: {}", e);
                Ok(CallToolResult::error(format!("Failed to save research output: {}", e)))
            }
        }
    }
}

/// Records how a completed request went
pub struct RecordInteractionHandler {
    service: Arc<LearningService>,
}

impl RecordInteractionHandler {
    #[inline]
    pub fn new(service: Arc<LearningService>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "record_interaction".to_string(),
            description: Some("Record the outcome of a completed research request".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's request"
                    },
                    "response": {
                        "type": "string",
                        "description": "The answer that was given"
                    },
                    "success": {
                        "type": "boolean",
                        "description": "Whether the request was answered successfully"
                    }
                },
                "required": ["query", "response", "success"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for RecordInteractionHandler {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = arguments(params);
        let query = required_str(&args, "query")?;
        let response = required_str(&args, "response")?;
        let success = args
            .get("success")
            .and_then(Value::as_bool)
            .ok_or_else(|| anyhow!("Missing required parameter: success"))?;

        match self.service.record_interaction(query, response, success).await {
            Ok(record) => Ok(CallToolResult::text(format!(
                "Interaction {} recorded",
                record.id
            ))),
            Err(e) => {
                error!("Failed to record interaction: {}", e);
                Ok(CallToolResult::error(format!("Failed to record interaction: {}", e)))
            }
        }
    }
}

/// Aggregate performance metrics
pub struct LearningAnalysisHandler {
    service: Arc<LearningService>,
}

impl LearningAnalysisHandler {
    #[inline]
    pub fn new(service: Arc<LearningService>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "learning_analysis".to_string(),
            description: Some("Analyze the learning data and performance metrics".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for LearningAnalysisHandler {
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        match self.service.analytics_summary().await {
            Ok(summary) => Ok(CallToolResult::text(summary)),
            Err(e) => {
                error!("Failed to analyze learning data: {}", e);
                Ok(CallToolResult::error(format!("Failed to analyze learning data: {}", e)))
            }
        }
    }
}

/// Human-readable dump of recent learned data
pub struct ViewLearningDataHandler {
    service: Arc<LearningService>,
}

impl ViewLearningDataHandler {
    #[inline]
    pub fn new(service: Arc<LearningService>) -> Self {
        Self { service }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "view_learning_data".to_string(),
            description: Some("View stored learning data in human-readable format".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for ViewLearningDataHandler {
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.service.analytics_detail().await))
    }
}
