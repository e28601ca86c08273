//! Anthropic API backend.

use std::time::Duration;

use crate::model::{
    Backend, ContentBlock, Message, ModelError, ModelRequest, ModelResponse, ToolCall, ToolSpec,
    Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
const API_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    timeout: Option<Duration>,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the API origin (scheme and host, no path).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fail requests that take longer than `timeout` with [`ModelError::Timeout`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AnthropicBackend, ModelError> {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(AnthropicBackend {
            client,
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            endpoint: format!("{}/v1/messages", self.base_url.trim_end_matches('/')),
            timeout: self.timeout,
        })
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
    timeout: Option<Duration>,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn message_to_api(msg: &Message) -> ApiMessage<'_> {
        ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        ApiTool {
            name: &spec.name,
            description: &spec.description,
            input_schema: &spec.input_schema,
        }
    }

    fn response_to_blocks(blocks: Vec<ApiResponseBlock>) -> Vec<ContentBlock> {
        blocks
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolCall(ToolCall { id, name, input }))
                }
                ApiResponseBlock::Unknown => None,
            })
            .collect()
    }

    fn map_send_error(&self, e: reqwest::Error) -> ModelError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => ModelError::Timeout(timeout.as_millis() as u64),
            _ => ModelError::Network(e.to_string()),
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Backend for AnthropicBackend {
    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: request.system,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        tracing::debug!(
            model = %self.model,
            messages = api_request.messages.len(),
            tools = api_request.tools.len(),
            "sending model request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(ModelError::Api { status, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let usage = Usage {
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        };

        Ok(ModelResponse {
            content: Self::response_to_blocks(api_response.content),
            usage,
        })
    }
}
