use rmcp::service::ServiceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ServiceError> for ToolError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::McpError(error) => Self::Execution(error.message.to_string()),
            ServiceError::TransportClosed => Self::Unavailable("transport closed".into()),
            other => Self::Execution(other.to_string()),
        }
    }
}
