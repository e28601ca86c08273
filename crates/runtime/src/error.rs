use std::path::PathBuf;

use thiserror::Error;

use crate::model::ModelError;
use crate::tools::ToolError;

/// Runtime errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The provider script is neither `.py` nor `.js`.
    #[error("unsupported server script {}: expected a .py or .js file", .path.display())]
    UnsupportedScriptKind { path: PathBuf },

    /// The tool provider cannot be reached.
    #[error("tool provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A single tool invocation failed.
    #[error("tool {name} failed: {source}")]
    ToolInvocation {
        name: String,
        #[source]
        source: ToolError,
    },

    /// The model API call failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model kept requesting tools past the round limit.
    #[error("no final answer after {max_rounds} model rounds")]
    LoopLimitExceeded { max_rounds: usize },

    /// The launcher for the provider script could not be started.
    #[error("failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider did not complete the MCP handshake.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    #[error("provider did not finish starting within {timeout_ms}ms")]
    StartupTimeout { timeout_ms: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
