//! # servicenow-mcp
//!
//! MCP (Model Context Protocol) server for ServiceNow incident records.
//!
//! This crate exposes the ServiceNow `incident` table as tools for AI agents.
//! It implements the MCP protocol over stdin/stdout using JSON-RPC 2.0 and talks
//! to one or more instances through the Table API.
//!
//! ## 5 Incident Tools
//!
//! `incident_query`, `incident_get`, `incident_create`, `incident_update`,
//! `incident_delete`
//!
//! Agents may use labels such as "In Progress" or "Critical" for `state`,
//! `priority`, `urgency` and `impact`; they are translated to the instance's
//! numeric codes before any request is sent. Records are addressed either by
//! `sys_id` or by their human-readable number (`INC0010001`).
//!
//! ## Usage
//!
//! The server is typically run as an executable and configured in AI tools like Claude Desktop:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "servicenow": {
//!       "command": "/path/to/servicenow-mcp",
//!       "env": {
//!         "SERVICENOW_INSTANCE_URL": "https://dev1234.service-now.com",
//!         "SERVICENOW_USERNAME": "admin",
//!         "SERVICENOW_PASSWORD": "secret"
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! ## Library Usage
//!
//! For testing or embedding, the server can run against any [`RecordStore`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use servicenow_mcp::{McpServer, McpSession, MemoryStore};
//!
//! # async fn demo() {
//! let session = McpSession::new(Arc::new(MemoryStore::new()));
//! let server = McpServer::new(session);
//!
//! let reply = server
//!     .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
//!     .await;
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod filter;
pub mod render;
pub mod resolve;
mod server;
mod session;
pub mod store;
pub mod tools;
pub mod validate;
pub mod vocabulary;

pub use config::{Config, InstanceName};
pub use error::{McpError, Result};
pub use filter::{FilterExpression, FilterValue, Operator};
pub use server::{JsonRpcRequest, JsonRpcResponse, McpServer};
pub use session::McpSession;
pub use store::memory::MemoryStore;
pub use store::{RecordStore, RestStore, StoreError};
pub use tools::{ToolDef, ToolRegistry};
