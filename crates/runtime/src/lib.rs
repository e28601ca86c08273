//! Relay runtime: the model/tool conversation loop.
//!
//! The runtime connects a model backend to an MCP tool provider and resolves
//! user queries by letting the model call tools until it answers in text.
//!
//! # Overview
//!
//! - **Backend**: a trait abstracting model providers ([`AnthropicBackend`]).
//! - **ToolHost**: a trait abstracting tool providers ([`McpToolHost`]).
//! - **ConversationLoop**: the request / tool-call / continue cycle for one query.
//! - **Session** and **Shell**: the context object and its interactive front end.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{
//!     AnthropicBackendBuilder, DEFAULT_STARTUP_TIMEOUT, Launchers, McpToolHost, Session, ToolHost,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = AnthropicBackendBuilder::new("sk-ant-api01-...", "claude-3-5-sonnet-20241022")
//!     .build()?;
//! let host = McpToolHost::connect(
//!     Path::new("meme_server.py"),
//!     &Launchers::default(),
//!     DEFAULT_STARTUP_TIMEOUT,
//! )
//! .await?;
//!
//! let session = Session::new(backend, host);
//! let outcome = session.process_query("add 2 and 3").await?;
//! println!("{}", outcome.answer);
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod conversation;
mod error;
pub mod model;
pub mod prompt;
pub mod providers;
mod session;
mod shell;
pub mod tools;

pub use conversation::{ConversationLoop, DEFAULT_MAX_ROUNDS, LoopOptions, QueryOutcome, ToolInvocation};
pub use error::{Error, Result};
pub use model::{
    Backend, ContentBlock, Message, ModelError, ModelRequest, ModelResponse, Role, ToolCall,
    ToolSpec, Usage,
};
pub use providers::{AnthropicBackend, AnthropicBackendBuilder};
pub use session::Session;
pub use shell::Shell;
pub use tools::{
    DEFAULT_STARTUP_TIMEOUT, Launchers, McpToolHost, ScriptKind, ToolError, ToolHost,
};
