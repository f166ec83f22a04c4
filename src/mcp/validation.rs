//! JSON Schema validation for incoming MCP messages and tool arguments

use crate::mcp::protocol::*;
use anyhow::{Result, anyhow};
use jsonschema::{Draft, Validator};
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

fn id_schema() -> Value {
    json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})
}

/// Compile `schema` as a draft 7 JSON Schema
#[inline]
pub fn compile_schema(name: &str, schema: &Value) -> Result<Validator> {
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|e| anyhow!("Failed to compile schema '{}': {}", name, e))
}

/// Check `value` against `validator`, joining every violation into one message
#[inline]
pub fn check(validator: &Validator, label: &str, value: &Value) -> Result<(), String> {
    let violations: Vec<String> = validator
        .iter_errors(value)
        .map(|e| e.to_string())
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(format!("{} is invalid: {}", label, violations.join(", ")))
    }
}

/// Envelope and method-parameter schemas for JSON-RPC 2.0 messages
pub struct MessageValidator {
    schemas: HashMap<&'static str, Validator>,
}

impl std::fmt::Debug for MessageValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.schemas.keys().collect();
        names.sort_unstable();
        f.debug_struct("MessageValidator")
            .field("schemas", &names)
            .finish()
    }
}

impl MessageValidator {
    #[inline]
    pub fn new() -> Result<Self> {
        let builtin = [
            (
                "request",
                json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": {"const": JSONRPC_VERSION},
                        "method": {"type": "string"},
                        "params": {"type": ["object", "array"]},
                        "id": id_schema()
                    },
                    "required": ["jsonrpc", "method", "id"]
                }),
            ),
            (
                "notification",
                json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": {"const": JSONRPC_VERSION},
                        "method": {"type": "string"},
                        "params": {"type": ["object", "array"]}
                    },
                    "required": ["jsonrpc", "method"]
                }),
            ),
            (
                "response",
                json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": {"const": JSONRPC_VERSION},
                        "result": {},
                        "id": id_schema()
                    },
                    "required": ["jsonrpc", "result", "id"]
                }),
            ),
            (
                "error_response",
                json!({
                    "type": "object",
                    "properties": {
                        "jsonrpc": {"const": JSONRPC_VERSION},
                        "error": {
                            "type": "object",
                            "properties": {
                                "code": {"type": "integer"},
                                "message": {"type": "string"},
                                "data": {}
                            },
                            "required": ["code", "message"]
                        },
                        "id": {"oneOf": [{"type": "string"}, {"type": "integer"}, {"type": "null"}]}
                    },
                    "required": ["jsonrpc", "error", "id"]
                }),
            ),
            (
                "initialize",
                json!({
                    "type": "object",
                    "properties": {
                        "protocolVersion": {"type": "string"},
                        "capabilities": {"type": "object"},
                        "clientInfo": {
                            "type": "object",
                            "properties": {
                                "name": {"type": "string"},
                                "version": {"type": "string"}
                            },
                            "required": ["name", "version"]
                        }
                    },
                    "required": ["protocolVersion", "capabilities", "clientInfo"]
                }),
            ),
            (
                "tools/call",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "arguments": {"type": "object"}
                    },
                    "required": ["name"]
                }),
            ),
        ];

        let mut schemas = HashMap::new();
        for (name, schema) in builtin {
            schemas.insert(name, compile_schema(name, &schema)?);
        }
        debug!("Loaded {} built-in JSON schemas", schemas.len());

        Ok(Self { schemas })
    }

    fn check_named(&self, name: &str, value: &Value) -> Result<(), String> {
        match self.schemas.get(name) {
            Some(validator) => check(validator, name, value),
            None => Err(format!("Schema '{}' not found", name)),
        }
    }

    /// Validate the envelope of a raw message and decode it.
    ///
    /// Envelope violations are `INVALID_REQUEST`; bad `initialize` or
    /// `tools/call` parameters are `INVALID_PARAMS` and keep the request id.
    pub fn validate_raw_message(
        &self,
        value: Value,
    ) -> std::result::Result<JsonRpcMessage, (JsonRpcError, Option<RequestId>)> {
        let kind = match (
            value.get("method").is_some(),
            value.get("id").is_some(),
            value.get("error").is_some(),
        ) {
            (true, true, _) => "request",
            (true, false, _) => "notification",
            (false, _, true) => "error_response",
            (false, _, false) => "response",
        };

        if let Err(message) = self.check_named(kind, &value) {
            debug!("Rejected message: {}", message);
            return Err((JsonRpcError::invalid_request(), None));
        }

        let message: JsonRpcMessage = match kind {
            "request" => serde_json::from_value(value).map(JsonRpcMessage::Request),
            "notification" => serde_json::from_value(value).map(JsonRpcMessage::Notification),
            "error_response" => serde_json::from_value(value).map(JsonRpcMessage::ErrorResponse),
            _ => serde_json::from_value(value).map(JsonRpcMessage::Response),
        }
        .map_err(|_| (JsonRpcError::invalid_request(), None))?;

        if let JsonRpcMessage::Request(request) = &message {
            self.validate_method_params(request).map_err(|message| {
                (
                    JsonRpcError::invalid_params(Some(message)),
                    Some(request.id.clone()),
                )
            })?;
        }

        Ok(message)
    }

    fn validate_method_params(&self, request: &JsonRpcRequest) -> Result<(), String> {
        let method = request.method.as_str();
        if !matches!(method, "initialize" | "tools/call") {
            return Ok(());
        }

        match &request.params {
            Some(params) => self.check_named(method, params),
            None => Err(format!("{} request missing parameters", method)),
        }
    }
}
