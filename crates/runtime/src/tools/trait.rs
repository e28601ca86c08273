//! Tool host trait.

use crate::model::ToolSpec;
use crate::tools::ToolError;
use serde_json::Value;
use std::future::Future;

/// Trait for tool execution hosts.
///
/// Implementations enumerate tool specifications and execute tool calls.
/// This is the boundary between the model loop and side effects.
pub trait ToolHost: Send + Sync {
    /// Fetch the current tool set from the provider.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolSpec>, ToolError>> + Send;

    /// Execute a tool call, returning the tool's output as text.
    fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;

    /// Release the provider. Must be idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
