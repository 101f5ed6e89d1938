//! Error types for the MCP server.

use thiserror::Error;

use crate::config::{ConfigError, InstanceName};
use crate::store::StoreError;
use crate::validate::ValidationFailure;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors surfaced by tool dispatch and the protocol loop.
#[derive(Debug, Error)]
pub enum McpError {
    /// Payload failed schema or vocabulary checks. Never reaches the network.
    #[error("Invalid input:\n{0}")]
    Validation(#[from] ValidationFailure),

    /// Record store failure, tagged with the operation that hit it.
    #[error("{operation} on '{table}' failed: {source}")]
    Store {
        /// Store operation that failed.
        operation: &'static str,
        /// Table the operation addressed.
        table: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// `tools/call` named a tool that does not exist.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The payload named an instance without configuration.
    #[error("Instance '{0}' is not configured")]
    InstanceNotConfigured(InstanceName),

    /// A write tool was called on a read-only server.
    #[error("access denied: {0} rejected, server is running in read-only mode")]
    AccessDenied(String),

    /// Malformed `tools/call` parameters.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Startup configuration problem.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stdio failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Wrap a store failure with the operation and table it came from.
    pub fn store(operation: &'static str, table: &str, source: StoreError) -> Self {
        Self::Store {
            operation,
            table: table.to_string(),
            source,
        }
    }

    /// JSON-RPC error code for protocol-level replies.
    pub fn code(&self) -> i64 {
        match self {
            Self::UnknownTool(_) | Self::InvalidParams(_) | Self::Validation(_) => -32602,
            Self::Json(_) => -32700,
            _ => -32603,
        }
    }
}
