//! The tool-calling conversation loop.
//!
//! One user query is resolved by alternating model rounds and tool rounds:
//!
//! ```text
//! Init -> AwaitingModel -> HasResponse -+-> Done              (no tool calls)
//!              ^                        |
//!              +---- ExecutingTools <---+                     (>= 1 tool call)
//! ```
//!
//! Content blocks are handled strictly in the order the model returned them
//! and tool calls run one at a time, so the history is reproducible.

use std::time::Duration;

use serde_json::Value;

use crate::model::{Backend, ContentBlock, Message, ModelRequest, ToolCall, ToolSpec, Usage};
use crate::prompt::system_prompt;
use crate::tools::{ToolError, ToolHost};
use crate::{Error, Result};

/// Default bound on model calls per query.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Knobs for the conversation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Maximum number of model calls for one query.
    pub max_rounds: usize,
    /// Per tool call timeout. `None` waits indefinitely.
    pub tool_timeout: Option<Duration>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            tool_timeout: None,
        }
    }
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub output: std::result::Result<String, ToolError>,
}

impl ToolInvocation {
    /// The text fed back to the model in place of the tool's result.
    pub fn result_text(&self) -> String {
        let content = match &self.output {
            Ok(text) => text.clone(),
            Err(e) => e.to_string(),
        };
        format!("[Tool {} result: {content}]", self.name)
    }
}

/// Everything produced while resolving one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Text blocks from every round, newline-joined.
    pub answer: String,
    /// Number of model calls made.
    pub rounds: usize,
    /// Tool calls in execution order.
    pub invocations: Vec<ToolInvocation>,
    /// Token usage summed over all rounds.
    pub usage: Usage,
}

/// Drives a single query to completion.
pub struct ConversationLoop<'a, B, H> {
    backend: &'a B,
    host: &'a H,
    options: LoopOptions,
}

impl<'a, B: Backend, H: ToolHost> ConversationLoop<'a, B, H> {
    pub fn new(backend: &'a B, host: &'a H, options: LoopOptions) -> Self {
        Self {
            backend,
            host,
            options,
        }
    }

    /// Resolve `query` into a final answer.
    ///
    /// Tool failures are fed back to the model as results. Model failures
    /// and an unreachable provider abort the query.
    pub async fn run(&self, query: &str) -> Result<QueryOutcome> {
        let tools = self
            .host
            .list_tools()
            .await
            .map_err(|e| Error::ProviderUnavailable(e.to_string()))?;
        let system = system_prompt(&tools);

        let mut history: Vec<Message> = Vec::new();
        let mut answer: Vec<String> = Vec::new();
        let mut invocations = Vec::new();
        let mut usage = Usage::default();
        let mut messages = vec![Message::user(query)];
        let mut rounds = 0;

        loop {
            if rounds == self.options.max_rounds {
                return Err(Error::LoopLimitExceeded {
                    max_rounds: self.options.max_rounds,
                });
            }
            rounds += 1;
            tracing::debug!(round = rounds, messages = messages.len(), "awaiting model");

            let response = self
                .backend
                .complete(ModelRequest {
                    system: &system,
                    messages: &messages,
                    tools: &tools,
                })
                .await?;
            usage += response.usage;

            let called_tools = response.has_tool_calls();
            for block in response.content {
                match block {
                    // Empty text joins the answer but never the history.
                    ContentBlock::Text { text } => {
                        if !text.is_empty() {
                            history.push(Message::assistant(text.clone()));
                        }
                        answer.push(text);
                    }
                    ContentBlock::ToolCall(call) => {
                        let invocation = self.execute(call, &tools).await;
                        history.push(Message::assistant(format!(
                            "I'm using the {} tool with these parameters: {}",
                            invocation.name, invocation.arguments
                        )));
                        history.push(Message::user(invocation.result_text()));
                        invocations.push(invocation);
                    }
                }
            }

            if !called_tools {
                break;
            }

            messages = history.clone();
            messages.push(Message::user(query));
        }

        tracing::debug!(rounds, tool_calls = invocations.len(), "query resolved");
        Ok(QueryOutcome {
            answer: answer.join("\n"),
            rounds,
            invocations,
            usage,
        })
    }

    async fn execute(&self, call: ToolCall, tools: &[ToolSpec]) -> ToolInvocation {
        let output = if tools.iter().any(|t| t.name == call.name) {
            self.call_with_timeout(&call).await
        } else {
            Err(ToolError::NotFound(call.name.clone()))
        };

        match &output {
            Ok(_) => tracing::info!(tool = %call.name, "tool call succeeded"),
            Err(e) => tracing::warn!(tool = %call.name, error = %e, "tool call failed"),
        }

        ToolInvocation {
            name: call.name,
            arguments: call.input,
            output,
        }
    }

    async fn call_with_timeout(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        let fut = self.host.call_tool(&call.name, &call.input);
        match self.options.tool_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .unwrap_or(Err(ToolError::Timeout(timeout.as_millis() as u64))),
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, ModelResponse};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<std::result::Result<ModelResponse, ModelError>>>,
        requests: Mutex<Vec<(String, Vec<Message>)>>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Vec<ContentBlock>>) -> Self {
            Self::with_results(
                responses
                    .into_iter()
                    .map(|content| {
                        Ok(ModelResponse {
                            content,
                            usage: Usage {
                                input_tokens: 10,
                                output_tokens: 5,
                            },
                        })
                    })
                    .collect(),
            )
        }

        fn with_results(results: Vec<std::result::Result<ModelResponse, ModelError>>) -> Self {
            Self {
                responses: Mutex::new(results.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(String, Vec<Message>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Backend for ScriptedBackend {
        async fn complete(
            &self,
            request: ModelRequest<'_>,
        ) -> std::result::Result<ModelResponse, ModelError> {
            self.requests
                .lock()
                .unwrap()
                .push((request.system.to_string(), request.messages.to_vec()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelResponse::default()))
        }
    }

    /// In-memory tools: `add`, `echo`, `broken`, and `slow`.
    #[derive(Default)]
    struct FakeHost {
        calls: Mutex<Vec<(String, Value)>>,
        unavailable: bool,
    }

    impl ToolHost for FakeHost {
        async fn list_tools(&self) -> std::result::Result<Vec<ToolSpec>, ToolError> {
            if self.unavailable {
                return Err(ToolError::Unavailable("pipe closed".into()));
            }
            Ok(["add", "echo", "broken", "slow"]
                .into_iter()
                .map(|name| ToolSpec {
                    name: name.into(),
                    description: format!("the {name} tool"),
                    input_schema: json!({"type": "object"}),
                })
                .collect())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: &Value,
        ) -> std::result::Result<String, ToolError> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments.clone()));
            match name {
                "add" => Ok((arguments["a"].as_i64().unwrap_or(0)
                    + arguments["b"].as_i64().unwrap_or(0))
                .to_string()),
                "echo" => Ok(arguments["text"].as_str().unwrap_or_default().to_string()),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("late".into())
                }
                _ => Err(ToolError::Execution("provider exploded".into())),
            }
        }
    }

    fn run_loop<'a>(
        backend: &'a ScriptedBackend,
        host: &'a FakeHost,
    ) -> ConversationLoop<'a, ScriptedBackend, FakeHost> {
        ConversationLoop::new(backend, host, LoopOptions::default())
    }

    #[tokio::test]
    async fn text_only_response_takes_one_round() {
        let backend = ScriptedBackend::new(vec![vec![ContentBlock::text("Hello!")]]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("hi").await.unwrap();

        assert_eq!(outcome.answer, "Hello!");
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.invocations.is_empty());
        assert_eq!(backend.requests().len(), 1);
        assert_eq!(backend.requests()[0].1, vec![Message::user("hi")]);
        assert!(host.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_scenario_feeds_result_back() {
        let backend = ScriptedBackend::new(vec![
            vec![ContentBlock::tool_call("t1", "add", json!({"a": 2, "b": 3}))],
            vec![ContentBlock::text("2 plus 3 is 5.")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("add 2 and 3").await.unwrap();

        assert_eq!(outcome.answer, "2 plus 3 is 5.");
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.invocations[0].output, Ok("5".to_string()));
        assert_eq!(outcome.usage.total_tokens(), 30);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1].1,
            vec![
                Message::assistant(r#"I'm using the add tool with these parameters: {"a":2,"b":3}"#),
                Message::user("[Tool add result: 5]"),
                Message::user("add 2 and 3"),
            ]
        );
        assert_eq!(requests[0].0, requests[1].0, "system prompt is stable");
        assert!(requests[0].0.contains("- add: the add tool"));
    }

    #[tokio::test]
    async fn answer_joins_text_from_all_rounds_in_order() {
        let backend = ScriptedBackend::new(vec![
            vec![
                ContentBlock::text("First,"),
                ContentBlock::tool_call("t1", "echo", json!({"text": "x"})),
                ContentBlock::text("then"),
            ],
            vec![
                ContentBlock::text("more"),
                ContentBlock::tool_call("t2", "echo", json!({"text": "y"})),
            ],
            vec![ContentBlock::text("done.")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("go").await.unwrap();

        assert_eq!(outcome.answer, "First,\nthen\nmore\ndone.");
        assert_eq!(outcome.rounds, 3);

        // Later rounds see the whole history, block order preserved.
        let third = &backend.requests()[2].1;
        let contents: Vec<_> = third.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            [
                "First,",
                r#"I'm using the echo tool with these parameters: {"text":"x"}"#,
                "[Tool echo result: x]",
                "then",
                "more",
                r#"I'm using the echo tool with these parameters: {"text":"y"}"#,
                "[Tool echo result: y]",
                "go",
            ]
        );
    }

    #[tokio::test]
    async fn empty_text_blocks_stay_out_of_history() {
        let backend = ScriptedBackend::new(vec![
            vec![
                ContentBlock::text(""),
                ContentBlock::tool_call("t1", "echo", json!({"text": "x"})),
            ],
            vec![ContentBlock::text("done.")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("go").await.unwrap();

        assert_eq!(outcome.answer, "\ndone.");
        let second = &backend.requests()[1].1;
        assert!(second.iter().all(|m| !m.content.is_empty()), "{second:?}");
        assert_eq!(second.len(), 3);
    }

    #[tokio::test]
    async fn tool_calls_run_in_block_order_before_next_round() {
        let backend = ScriptedBackend::new(vec![
            vec![
                ContentBlock::tool_call("t1", "echo", json!({"text": "one"})),
                ContentBlock::tool_call("t2", "add", json!({"a": 1, "b": 1})),
                ContentBlock::tool_call("t3", "echo", json!({"text": "three"})),
            ],
            vec![ContentBlock::text("ok")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("go").await.unwrap();

        let calls: Vec<_> = host
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        assert_eq!(calls, ["echo", "add", "echo"]);
        assert_eq!(outcome.invocations.len(), 3);
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn failing_tool_is_reported_to_the_model() {
        let backend = ScriptedBackend::new(vec![
            vec![ContentBlock::tool_call("t1", "broken", json!({}))],
            vec![ContentBlock::text("The tool failed, sorry.")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("try it").await.unwrap();

        assert_eq!(outcome.answer, "The tool failed, sorry.");
        assert_eq!(
            backend.requests()[1].1[1],
            Message::user("[Tool broken result: execution failed: provider exploded]")
        );
    }

    #[tokio::test]
    async fn unknown_tool_fails_only_that_call() {
        let backend = ScriptedBackend::new(vec![
            vec![
                ContentBlock::tool_call("t1", "teleport", json!({})),
                ContentBlock::tool_call("t2", "add", json!({"a": 4, "b": 4})),
            ],
            vec![ContentBlock::text("8")],
        ]);
        let host = FakeHost::default();

        let outcome = run_loop(&backend, &host).run("go").await.unwrap();

        assert_eq!(
            outcome.invocations[0].output,
            Err(ToolError::NotFound("teleport".into()))
        );
        assert_eq!(outcome.invocations[1].output, Ok("8".to_string()));
        let calls = host.calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "unknown tools never reach the provider");
    }

    #[tokio::test]
    async fn slow_tool_times_out_into_result() {
        let backend = ScriptedBackend::new(vec![
            vec![ContentBlock::tool_call("t1", "slow", json!({}))],
            vec![ContentBlock::text("gave up")],
        ]);
        let host = FakeHost::default();
        let options = LoopOptions {
            tool_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };

        let outcome = ConversationLoop::new(&backend, &host, options)
            .run("go")
            .await
            .unwrap();

        assert_eq!(outcome.invocations[0].output, Err(ToolError::Timeout(20)));
        assert_eq!(
            outcome.invocations[0].result_text(),
            "[Tool slow result: timeout after 20ms]"
        );
    }

    #[tokio::test]
    async fn model_error_aborts_the_query() {
        let backend = ScriptedBackend::with_results(vec![Err(ModelError::Api {
            status: 429,
            message: "rate limited".into(),
        })]);
        let host = FakeHost::default();

        let err = run_loop(&backend, &host).run("hi").await.unwrap_err();
        assert!(matches!(err, Error::Model(ModelError::Api { status: 429, .. })));
    }

    #[tokio::test]
    async fn unreachable_provider_aborts_before_model_call() {
        let backend = ScriptedBackend::new(vec![vec![ContentBlock::text("never")]]);
        let host = FakeHost {
            unavailable: true,
            ..Default::default()
        };

        let err = run_loop(&backend, &host).run("hi").await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn endless_tool_requests_hit_the_round_limit() {
        let responses = (0..5)
            .map(|i| vec![ContentBlock::tool_call(format!("t{i}"), "echo", json!({"text": "again"}))])
            .collect();
        let backend = ScriptedBackend::new(responses);
        let host = FakeHost::default();
        let options = LoopOptions {
            max_rounds: 3,
            ..Default::default()
        };

        let err = ConversationLoop::new(&backend, &host, options)
            .run("loop forever")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::LoopLimitExceeded { max_rounds: 3 }));
        assert_eq!(backend.requests().len(), 3);
    }
}
