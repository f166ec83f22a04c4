//! Line-delimited JSON-RPC server loop and request routing

use crate::mcp::protocol::*;
use crate::mcp::validation::{MessageValidator, check, compile_schema};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Executes one registered tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Missing or malformed arguments are errors; failures while running the
    /// tool belong in the returned result
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

struct RegisteredTool {
    definition: Tool,
    arguments: jsonschema::Validator,
    handler: Box<dyn ToolHandler>,
}

/// Tool server speaking MCP over newline-delimited JSON-RPC
pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    validator: MessageValidator,
    tools: RwLock<BTreeMap<String, RegisteredTool>>,
    connection_state: RwLock<ConnectionState>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("server_info", &self.server_info)
            .finish_non_exhaustive()
    }
}

impl McpServer {
    #[inline]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        Ok(Self {
            server_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            capabilities: ServerCapabilities {
                logging: Some(LoggingCapability {}),
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            instructions: None,
            validator: MessageValidator::new()?,
            tools: RwLock::new(BTreeMap::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
        })
    }

    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register `handler`; calls are checked against the definition's input schema
    pub async fn register_tool<H>(&self, definition: Tool, handler: H) -> Result<()>
    where
        H: ToolHandler + 'static,
    {
        let name = definition.name.clone();
        let arguments = compile_schema(&name, &definition.input_schema)?;
        self.tools.write().await.insert(
            name.clone(),
            RegisteredTool {
                definition,
                arguments,
                handler: Box::new(handler),
            },
        );
        debug!("Registered tool: {}", name);
        Ok(())
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.keys().cloned().collect()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    /// Serve requests from stdin until EOF; responses go to stdout
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve newline-delimited messages from `reader` until EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(reply) = self.handle_line(trimmed).await {
                        send_message(&mut writer, &reply).await?;
                    }
                }
                Err(e) => {
                    error!("Error reading from input: {}", e);
                    break;
                }
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;
        info!("MCP server stopped");
        Ok(())
    }

    /// Process one raw line; notifications and client responses produce no reply
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcMessage> {
        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON: {}", e);
                return Some(error_message(JsonRpcError::parse_error(), None));
            }
        };

        match self.validator.validate_raw_message(raw) {
            Ok(message) => self.process_message(message).await,
            Err((error, id)) => {
                warn!("Message validation failed: {}", error.message);
                Some(error_message(error, id))
            }
        }
    }

    pub async fn process_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(&notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        debug!("Handling request: {}", request.method);

        let outcome = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            _ => Err(JsonRpcError::method_not_found()),
        };

        match outcome {
            Ok(result) => JsonRpcMessage::Response(JsonRpcResponse::new(result, request.id)),
            Err(error) => {
                warn!("Request {} failed: {}", request.method, error.message);
                error_message(error, Some(request.id))
            }
        }
    }

    async fn handle_notification(&self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                *self.connection_state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => debug!("Received cancellation notification"),
            _ => warn!("Unknown notification method: {}", notification.method),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = params
            .ok_or_else(|| {
                JsonRpcError::invalid_params(Some(
                    "Initialize request missing parameters".to_string(),
                ))
            })
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(Some(e.to_string())))
            })?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            return Err(JsonRpcError::invalid_params(Some(format!(
                "Unsupported protocol version: {}. Supported: {}",
                params.protocol_version,
                SUPPORTED_PROTOCOL_VERSIONS.join(", ")
            ))));
        }

        *self.connection_state.write().await = ConnectionState::Initializing;

        let result = InitializeResult {
            protocol_version: params.protocol_version,
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };

        info!("Client initialized: {}", params.client_info.name);
        to_result_value(&result)
    }

    async fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self.tools.read().await;
        let result = ListToolsResult {
            tools: tools.values().map(|tool| tool.definition.clone()).collect(),
        };
        to_result_value(&result)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| {
                JsonRpcError::invalid_params(Some("Tool call request missing parameters".to_string()))
            })
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::invalid_params(Some(e.to_string())))
            })?;

        let tools = self.tools.read().await;
        let tool = tools.get(&params.name).ok_or_else(|| {
            JsonRpcError::invalid_params(Some(format!("Tool not found: {}", params.name)))
        })?;

        let arguments = Value::Object(
            params
                .arguments
                .iter()
                .flatten()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        );
        check(&tool.arguments, "arguments", &arguments).map_err(|message| {
            JsonRpcError::invalid_params(Some(format!("{}: {}", params.name, message)))
        })?;

        let name = params.name.clone();
        let result = tool
            .handler
            .handle(params)
            .await
            .map_err(|e| JsonRpcError::invalid_params(Some(format!("{}: {}", name, e))))?;
        to_result_value(&result)
    }
}

fn error_message(error: JsonRpcError, id: Option<RequestId>) -> JsonRpcMessage {
    JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, id))
}

fn to_result_value<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(Some(e.to_string())))
}

async fn send_message<W>(writer: &mut W, message: &JsonRpcMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
