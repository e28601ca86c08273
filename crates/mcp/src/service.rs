//! Serving tools over MCP (the provider side of the protocol).

use std::future::Future;

use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, Incoming, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities, Tool,
    ToolsCapability, codes, negotiate_version,
};
use crate::transport::Transport;

/// A set of tools served over MCP.
pub trait ToolHandler: Send + Sync {
    /// The tools this handler exposes. Names must be unique.
    fn tools(&self) -> Vec<Tool>;

    /// Invoke a tool. Failures are reported in-band with
    /// [`CallToolResult::error`].
    fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = CallToolResult> + Send;
}

/// Serve `handler` until the peer closes its write half.
pub async fn serve<H: ToolHandler>(
    handler: &H,
    server_info: Implementation,
    reader: impl AsyncRead + Send + Unpin + 'static,
    writer: impl AsyncWrite + Send + Unpin + 'static,
) -> Result<()> {
    let mut transport = Transport::new(reader, writer);

    loop {
        let value = match transport.recv().await {
            Ok(Some(value)) => value,
            Ok(None) => break,
            Err(crate::Error::Serialize(e)) => {
                tracing::warn!(error = %e, "unparseable message");
                let error = JsonRpcError::new(codes::PARSE_ERROR, e.to_string());
                transport
                    .send(&serde_json::json!({"jsonrpc": "2.0", "id": null, "error": error}))
                    .await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        let message = match Incoming::classify(value) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "invalid message");
                let error = JsonRpcError::new(codes::INVALID_REQUEST, e.to_string());
                transport
                    .send(&serde_json::json!({"jsonrpc": "2.0", "id": null, "error": error}))
                    .await?;
                continue;
            }
        };

        match message {
            Incoming::Request(request) => {
                tracing::debug!(id = %request.id, method = %request.method, "request");
                let response =
                    dispatch(handler, &server_info, request.id, &request.method, request.params)
                        .await;
                transport.send(&response).await?;
            }
            Incoming::Notification { method, .. } => {
                tracing::debug!(%method, "notification");
            }
            Incoming::Response(response) => {
                tracing::debug!(id = %response.id, "ignoring response from client");
            }
        }
    }

    tracing::info!("client disconnected");
    Ok(())
}

async fn dispatch<H: ToolHandler>(
    handler: &H,
    server_info: &Implementation,
    id: RequestId,
    method: &str,
    params: Option<Value>,
) -> JsonRpcResponse {
    let result = match method {
        "initialize" => initialize(server_info, params),
        "ping" => Ok(Value::Object(Map::new())),
        "tools/list" => to_value(ListToolsResult {
            tools: handler.tools(),
            next_cursor: None,
        }),
        "tools/call" => call_tool(handler, params).await,
        other => Err(JsonRpcError::method_not_found(other)),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::failure(id, error),
    }
}

fn initialize(
    server_info: &Implementation,
    params: Option<Value>,
) -> std::result::Result<Value, JsonRpcError> {
    let params = params
        .map(serde_json::from_value::<InitializeParams>)
        .transpose()
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
    let requested = params.as_ref().and_then(|p| p.protocol_version.as_deref());
    let protocol_version = negotiate_version(requested);

    if let Some(client) = params.as_ref().and_then(|p| p.client_info.as_ref()) {
        tracing::info!(client = %client.name, protocol_version, "client connected");
    }

    to_value(InitializeResult {
        protocol_version: protocol_version.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability::default()),
        },
        server_info: server_info.clone(),
        instructions: None,
    })
}

async fn call_tool<H: ToolHandler>(
    handler: &H,
    params: Option<Value>,
) -> std::result::Result<Value, JsonRpcError> {
    let params: CallToolParams = params
        .ok_or_else(|| JsonRpcError::invalid_params("missing params"))
        .and_then(|p| {
            serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
        })?;

    if !handler.tools().iter().any(|t| t.name == params.name) {
        return Err(JsonRpcError::invalid_params(format!(
            "unknown tool: {}",
            params.name
        )));
    }

    let result = handler
        .call(&params.name, params.arguments.unwrap_or_default())
        .await;
    to_value(result)
}

fn to_value(value: impl serde::Serialize) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(codes::INTERNAL_ERROR, e.to_string()))
}
