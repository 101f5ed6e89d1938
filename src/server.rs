//! MCP protocol loop.
//!
//! Reads one JSON-RPC 2.0 message per line from stdin and writes one response
//! per line to stdout. Notifications get no reply. Tool failures are returned
//! as successful results flagged with `isError` so the agent can read them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{McpError, Result};
use crate::session::McpSession;
use crate::tools::ToolRegistry;

/// Protocol revision advertised in the `initialize` reply.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;

/// An incoming JSON-RPC request or notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker, expected to be "2.0"
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request id; absent for notifications
    #[serde(default)]
    pub id: Option<JsonValue>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<JsonValue>,
}

/// Error member of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JsonRpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Human-readable error text.
    pub message: String,
}

/// An outgoing JSON-RPC response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// Id of the request being answered; null for parse errors.
    pub id: JsonValue,
    /// Method result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful reply.
    pub fn success(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Protocol-level error reply.
    pub fn error(id: JsonValue, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn text_result(text: String, is_error: bool) -> JsonValue {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

/// MCP server bound to a session.
pub struct McpServer {
    session: McpSession,
    registry: ToolRegistry,
}

impl McpServer {
    /// Create a server with the incident tool registry.
    pub fn new(session: McpSession) -> Self {
        Self {
            session,
            registry: ToolRegistry::new(),
        }
    }

    /// Get the session.
    pub fn session(&self) -> &McpSession {
        &self.session
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        tracing::info!(tools = self.registry.tools().len(), "MCP server ready");

        while let Some(line) = lines.next_line().await? {
            if let Some(reply) = self.handle_line(&line).await {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one raw input line, returning the serialized reply if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request).await?,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable message");
                JsonRpcResponse::error(JsonValue::Null, PARSE_ERROR, format!("Parse error: {}", e))
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response");
                None
            }
        }
    }

    /// Handle a parsed request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.registry.tools() })),
            "tools/call" => match self.call_tool(request.params).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::error(id, e.code(), e.to_string()),
            },
            other => {
                tracing::debug!(method = other, "unknown method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", other))
            }
        };
        Some(response)
    }

    fn initialize_result(&self) -> JsonValue {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, params: Option<JsonValue>) -> Result<JsonValue> {
        let mut params = match params {
            Some(JsonValue::Object(map)) => map,
            _ => return Err(McpError::InvalidParams("expected an object".to_string())),
        };

        let name = match params.remove("name") {
            Some(JsonValue::String(name)) => name,
            _ => return Err(McpError::InvalidParams("missing tool name".to_string())),
        };

        let args = match params.remove("arguments") {
            None | Some(JsonValue::Null) => Map::new(),
            Some(JsonValue::Object(args)) => args,
            Some(_) => {
                return Err(McpError::InvalidParams(
                    "arguments must be an object".to_string(),
                ))
            }
        };

        match self.registry.dispatch(&self.session, &name, args).await {
            Ok(text) => Ok(text_result(text, false)),
            Err(e @ McpError::UnknownTool(_)) => Err(e),
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                Ok(text_result(format!("Error: {}", e), true))
            }
        }
    }
}
