//! MCP-backed tool host.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use rmcp::ServiceExt;
use rmcp::model::{CallToolRequestParams, CallToolResult, RawContent, ResourceContents};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

use super::{Launchers, ScriptKind, ToolError, ToolHost};
use crate::model::ToolSpec;
use crate::{Error, Result};

/// How long a provider gets to start and answer the handshake.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

type Service = RunningService<RoleClient, ()>;

/// Tool host backed by an MCP server.
///
/// Owns the server's child process (if any) for its whole lifetime. The
/// process is killed when the host is closed or dropped.
pub struct McpToolHost {
    service: Mutex<Option<Service>>,
    server_name: String,
    known: RwLock<HashSet<String>>,
}

impl McpToolHost {
    /// Launch a provider script and connect to it.
    ///
    /// The script kind is checked before anything is spawned. If the
    /// handshake fails or times out the child is killed.
    pub async fn connect(
        script: &Path,
        launchers: &Launchers,
        startup_timeout: Duration,
    ) -> Result<Self> {
        let kind = ScriptKind::detect(script).ok_or_else(|| Error::UnsupportedScriptKind {
            path: script.to_path_buf(),
        })?;
        let launcher = launchers.command_for(kind);

        let transport = TokioChildProcess::new(Command::new(launcher).configure(|cmd| {
            cmd.arg(script);
        }))
        .map_err(|source| Error::Spawn {
            command: launcher.to_string(),
            source,
        })?;
        tracing::info!(launcher, script = %script.display(), "tool provider spawned");

        let service = handshake(startup_timeout, ().serve(transport)).await?;
        Self::ready(service).await
    }

    /// Connect over already-open streams (no child process).
    pub async fn from_streams(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Result<Self> {
        let service = handshake(DEFAULT_STARTUP_TIMEOUT, ().serve((reader, writer))).await?;
        Self::ready(service).await
    }

    async fn ready(service: Service) -> Result<Self> {
        let server_name = service
            .peer_info()
            .map(|info| info.server_info.name.clone())
            .unwrap_or_default();
        let host = Self {
            service: Mutex::new(Some(service)),
            server_name,
            known: RwLock::new(HashSet::new()),
        };

        if let Err(e) = host.list_tools().await {
            host.close().await;
            return Err(Error::ProviderUnavailable(e.to_string()));
        }
        Ok(host)
    }

    /// Name the server reported during the handshake.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Names from the most recent tool listing.
    pub async fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.known.read().await.iter().cloned().collect();
        names.sort();
        names
    }

    /// Invoke a tool, raising failures as [`Error::ToolInvocation`].
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<String> {
        self.call_tool(name, arguments)
            .await
            .map_err(|source| Error::ToolInvocation {
                name: name.to_string(),
                source,
            })
    }

    async fn peer(&self) -> std::result::Result<Peer<RoleClient>, ToolError> {
        self.service
            .lock()
            .await
            .as_ref()
            .map(|service| service.peer().clone())
            .ok_or_else(|| ToolError::Unavailable("tool provider closed".into()))
    }
}

impl ToolHost for McpToolHost {
    async fn list_tools(&self) -> std::result::Result<Vec<ToolSpec>, ToolError> {
        let tools = self.peer().await?.list_all_tools().await?;

        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(tools.len());
        for tool in tools {
            if !seen.insert(tool.name.to_string()) {
                tracing::warn!(tool = %tool.name, "provider listed a duplicate tool name, ignoring");
                continue;
            }
            specs.push(ToolSpec::from(tool));
        }

        *self.known.write().await = seen;
        Ok(specs)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
    ) -> std::result::Result<String, ToolError> {
        if !self.known.read().await.contains(name) {
            return Err(ToolError::NotFound(name.to_string()));
        }

        let arguments = match arguments {
            Value::Object(map) => Some(map.clone()),
            Value::Null => None,
            other => {
                return Err(ToolError::InvalidInput(format!(
                    "arguments must be an object, got {other}"
                )));
            }
        };

        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };
        let result = self.peer().await?.call_tool(params).await?;

        let text = flatten(&result);
        if result.is_error == Some(true) {
            return Err(ToolError::Execution(text));
        }
        Ok(text)
    }

    /// Stop the service and the server behind it. Safe to call repeatedly.
    async fn close(&self) {
        let Some(service) = self.service.lock().await.take() else {
            return;
        };
        match service.cancel().await {
            Ok(reason) => tracing::info!(server = %self.server_name, ?reason, "tool provider stopped"),
            Err(e) => tracing::warn!(server = %self.server_name, error = %e, "tool provider shutdown failed"),
        }
    }
}

/// Bound the handshake. Dropping `serve` on timeout drops its transport,
/// which kills a spawned child.
async fn handshake<E: std::fmt::Display>(
    startup_timeout: Duration,
    serve: impl Future<Output = std::result::Result<Service, E>>,
) -> Result<Service> {
    match tokio::time::timeout(startup_timeout, serve).await {
        Ok(Ok(service)) => Ok(service),
        Ok(Err(e)) => Err(Error::Handshake(e.to_string())),
        Err(_) => Err(Error::StartupTimeout {
            timeout_ms: startup_timeout.as_millis() as u64,
        }),
    }
}

/// Content items joined by newlines. Non-text items get a short placeholder.
fn flatten(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .map(|content| match &content.raw {
            RawContent::Text(t) => t.text.clone(),
            RawContent::Image(image) => format!("[image: {}]", image.mime_type),
            RawContent::Resource(embedded) => match &embedded.resource {
                ResourceContents::TextResourceContents { text, .. } => text.clone(),
                ResourceContents::BlobResourceContents { uri, .. } => uri.clone(),
            },
            _ => "[unsupported content]".to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
