//! MCP (Model Context Protocol) tool serving over stdio.
//!
//! Implement [`ToolHandler`] and hand it to [`serve`] together with the two
//! halves of a byte stream. Clients connect with any MCP implementation.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{CallToolResult, Implementation, Tool, ToolHandler};
//! use serde_json::{Map, Value, json};
//!
//! struct Echo;
//!
//! impl ToolHandler for Echo {
//!     fn tools(&self) -> Vec<Tool> {
//!         vec![Tool::new("echo", "Repeat the input", json!({"type": "object"}))]
//!     }
//!
//!     async fn call(&self, _name: &str, arguments: Map<String, Value>) -> CallToolResult {
//!         CallToolResult::text(Value::Object(arguments).to_string())
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! mcp::serve(
//!     &Echo,
//!     Implementation::new("echo", env!("CARGO_PKG_VERSION")),
//!     tokio::io::stdin(),
//!     tokio::io::stdout(),
//! )
//! .await
//! # }
//! ```

mod error;
mod protocol;
mod service;
mod transport;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, Implementation, Incoming, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RequestId,
    SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, Tool, ToolContent, codes, negotiate_version,
};
pub use service::{ToolHandler, serve};
pub use transport::{MAX_MESSAGE_SIZE, Transport};
