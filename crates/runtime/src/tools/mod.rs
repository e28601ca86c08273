//! Tool execution and MCP integration.

pub mod errors;
mod mcp_host;
mod script;
mod r#trait;

pub use errors::ToolError;
pub use mcp_host::{DEFAULT_STARTUP_TIMEOUT, McpToolHost};
pub use script::{Launchers, ScriptKind};
pub use r#trait::ToolHost;
