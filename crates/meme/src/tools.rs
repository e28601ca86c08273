//! The meme-server tool set.

use mcp::{CallToolResult, Tool, ToolHandler};
use serde_json::{Map, Value, json};

use crate::client::{MemeClient, MemeConcept};
use crate::error::{MemeError, Result};

const CREATE_MEME_DESCRIPTION: &str = "A tool that YOU can and should use to generate memes via \
the RapidAPI meme generator service. You do not need to create or manipulate images directly: \
this tool handles all image generation. Pass a meme_concept object with template (e.g. \
\"Distracted-Boyfriend\"), top_text, bottom_text and optionally font_size (default 50) and font \
(default \"Impact\"). Returns a message with the path the meme was saved to.";

/// Exposes `add`, `create_meme` and `get_meme_templates` over MCP.
pub struct MemeTools {
    client: MemeClient,
}

impl MemeTools {
    pub fn new(client: MemeClient) -> Self {
        Self { client }
    }

    async fn dispatch(&self, name: &str, arguments: Map<String, Value>) -> Result<String> {
        match name {
            "add" => {
                let a = integer_arg(&arguments, "a")?;
                let b = integer_arg(&arguments, "b")?;
                let sum = a
                    .checked_add(b)
                    .ok_or_else(|| MemeError::InvalidInput(format!("{a} + {b} overflows")))?;
                Ok(sum.to_string())
            }
            "create_meme" => {
                let concept = meme_concept(arguments)?;
                let path = self.client.generate(&concept).await?;
                Ok(format!(
                    "Successfully generated meme! Saved to: {}",
                    path.display()
                ))
            }
            "get_meme_templates" => {
                let templates = self.client.templates().await?;
                serde_json::to_string(&templates).map_err(|e| MemeError::Request(e.to_string()))
            }
            other => Err(MemeError::InvalidInput(format!("unknown tool {other}"))),
        }
    }
}

impl ToolHandler for MemeTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": {
                        "a": {"type": "integer"},
                        "b": {"type": "integer"}
                    },
                    "required": ["a", "b"]
                }),
            ),
            Tool::new(
                "create_meme",
                CREATE_MEME_DESCRIPTION,
                json!({
                    "type": "object",
                    "properties": {
                        "meme_concept": {
                            "type": "object",
                            "properties": {
                                "template": {"type": "string"},
                                "top_text": {"type": "string"},
                                "bottom_text": {"type": "string"},
                                "font_size": {"type": "integer", "default": 50},
                                "font": {"type": "string", "default": "Impact"}
                            },
                            "required": ["template", "top_text", "bottom_text"]
                        }
                    },
                    "required": ["meme_concept"]
                }),
            ),
            Tool::new(
                "get_meme_templates",
                "Get a list of all available meme templates from the RapidAPI meme generator service.",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: Map<String, Value>) -> CallToolResult {
        match self.dispatch(name, arguments).await {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                CallToolResult::error(e.to_string())
            }
        }
    }
}

fn integer_arg(arguments: &Map<String, Value>, key: &str) -> Result<i64> {
    arguments
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| MemeError::InvalidInput(format!("{key} must be an integer")))
}

/// Accepts `{meme_concept: {...}}` and the doubly wrapped
/// `{meme_concept: {meme_concept: {...}}}`.
fn meme_concept(mut arguments: Map<String, Value>) -> Result<MemeConcept> {
    let mut concept = arguments
        .remove("meme_concept")
        .ok_or_else(|| MemeError::InvalidInput("missing meme_concept".into()))?;
    if let Some(inner) = concept.get_mut("meme_concept").map(Value::take) {
        concept = inner;
    }
    serde_json::from_value(concept)
        .map_err(|e| MemeError::InvalidInput(format!("meme_concept: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemeConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tools_for(server: &MockServer, output_dir: &std::path::Path) -> MemeTools {
        MemeTools::new(
            MemeClient::new(MemeConfig {
                api_key: Some("rapid-key".into()),
                base_url: server.uri(),
                output_dir: output_dir.to_path_buf(),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .map(|mcp::ToolContent::Text { text }| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn advertises_three_tools() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<_> = tools_for(&server, dir.path())
            .tools()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["add", "create_meme", "get_meme_templates"]);
    }

    #[tokio::test]
    async fn add_sums_integers() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_for(&server, dir.path());

        let result = tools.call("add", args(json!({"a": 2, "b": 3}))).await;
        assert!(!result.is_error);
        assert_eq!(text(&result), "5");

        let result = tools.call("add", args(json!({"a": "2", "b": 3}))).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "invalid input: a must be an integer");
    }

    #[tokio::test]
    async fn create_meme_accepts_doubly_wrapped_concept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meme"))
            .and(query_param("meme", "Drake"))
            .and(query_param("font_size", "40"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "image/jpeg"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_for(&server, dir.path());

        let result = tools
            .call(
                "create_meme",
                args(json!({"meme_concept": {"meme_concept": {
                    "template": "Drake",
                    "top_text": "tabs",
                    "bottom_text": "spaces",
                    "font_size": 40
                }}})),
            )
            .await;

        assert!(!result.is_error, "{}", text(&result));
        let expected = dir.path().join("Drake.jpg");
        assert_eq!(
            text(&result),
            format!("Successfully generated meme! Saved to: {}", expected.display())
        );
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn invalid_key_is_reported_in_band() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/meme"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_for(&server, dir.path());

        let result = tools
            .call(
                "create_meme",
                args(json!({"meme_concept": {
                    "template": "Drake",
                    "top_text": "a",
                    "bottom_text": "b"
                }})),
            )
            .await;

        assert!(result.is_error);
        assert!(text(&result).contains("Invalid API key"));
    }

    #[tokio::test]
    async fn missing_concept_fields_are_invalid_input() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_for(&server, dir.path());

        let result = tools.call("create_meme", Map::new()).await;
        assert!(result.is_error);
        assert_eq!(text(&result), "invalid input: missing meme_concept");

        let result = tools
            .call("create_meme", args(json!({"meme_concept": {"template": "Drake"}})))
            .await;
        assert!(result.is_error);
        assert!(text(&result).starts_with("invalid input: meme_concept:"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn templates_are_returned_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["Drake", "Doge"])))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let result = tools_for(&server, dir.path())
            .call("get_meme_templates", Map::new())
            .await;
        assert_eq!(text(&result), r#"["Drake","Doge"]"#);
    }
}
