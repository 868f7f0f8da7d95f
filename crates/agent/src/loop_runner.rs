//! The conversational tool-use loop.
//!
//! One `converse` call drives a single logical request through rounds of
//! "model asks for tools, host runs them, host reports results" until the
//! model answers with text only or the round cap is hit.

use std::sync::Arc;

use contentcrew_core::error::{ProviderError, ToolError};
use contentcrew_core::message::{Message, MessageToolCall, MessageToolResult};
use contentcrew_core::provider::{Provider, ProviderRequest};
use contentcrew_core::tool::{ToolCall, ToolRegistry};
use futures::future::join_all;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ROUNDS: u32 = 10;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 16384;

/// One logical request to the model.
#[derive(Debug, Clone)]
pub struct ConverseRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub tools: ToolRegistry,
    pub temperature: f32,
    /// Overrides the loop's round cap for this request.
    pub max_rounds: Option<u32>,
}

impl ConverseRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            tools: ToolRegistry::new(),
            temperature: 0.7,
            max_rounds: None,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }
}

/// Drives tool-use conversations against one provider and model.
#[derive(Clone)]
pub struct ToolLoop {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    max_rounds: u32,
}

impl ToolLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set the max output tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set the default round cap. Zero is treated as one.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run the loop and return the final text.
    ///
    /// Provider errors propagate. Tool failures never do: they are reported
    /// to the model as text. When the round cap is reached the most recent
    /// non-empty text is returned, which may be empty.
    pub async fn converse(&self, request: ConverseRequest) -> Result<String, ProviderError> {
        let max_rounds = request.max_rounds.unwrap_or(self.max_rounds).max(1);
        let declarations = request.tools.declarations();
        let mut history = vec![Message::user(request.user_prompt)];
        let mut last_text = String::new();

        for round in 1..=max_rounds {
            debug!(round, max_rounds, messages = history.len(), "Tool loop round");

            let response = self
                .provider
                .complete(ProviderRequest {
                    model: self.model.clone(),
                    system_prompt: Some(request.system_prompt.clone()),
                    messages: history.clone(),
                    temperature: request.temperature,
                    max_tokens: Some(self.max_tokens),
                    tools: declarations.clone(),
                })
                .await?;

            let message = response.message;
            if !message.content.is_empty() {
                last_text = message.content.clone();
            }

            if !message.has_tool_calls() {
                info!(rounds = round, model = %response.model, "Conversation finished");
                return Ok(message.content);
            }

            if round == max_rounds {
                warn!(
                    rounds = round,
                    pending_calls = message.tool_calls.len(),
                    "Max tool rounds reached, returning last text"
                );
                break;
            }

            debug!(tool_count = message.tool_calls.len(), "Executing tool calls");
            let results = join_all(
                message
                    .tool_calls
                    .iter()
                    .map(|call| invoke(&request.tools, call)),
            )
            .await;

            history.push(message);
            history.push(Message::tool_results(results));
        }

        Ok(last_text)
    }
}

/// Run one requested tool and render its outcome as text for the model.
async fn invoke(tools: &ToolRegistry, call: &MessageToolCall) -> MessageToolResult {
    let tool_call = ToolCall {
        id: call.id.clone(),
        name: call.name.clone(),
        arguments: call.arguments.clone(),
    };

    let (content, is_error) = match tools.execute(&tool_call).await {
        Ok(result) => (result.output, !result.success),
        Err(ToolError::NotFound(_)) => {
            warn!(tool = %call.name, "Model requested an unregistered tool");
            (format!("Unknown function: {}", call.name), true)
        }
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Tool execution failed");
            (format!("Error calling {}: {e}", call.name), true)
        }
    };

    MessageToolResult {
        call_id: call.id.clone(),
        name: call.name.clone(),
        content,
        is_error,
    }
}

impl std::fmt::Debug for ToolLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolLoop")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("max_rounds", &self.max_rounds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        AlwaysToolProvider, CountingTool, FailingTool, SequentialMockProvider, make_text_response,
        make_tool_call, make_tool_call_response,
    };
    use contentcrew_core::message::Role;

    #[tokio::test]
    async fn text_only_response_is_final() {
        let provider = Arc::new(SequentialMockProvider::single_text("Final report"));
        let agent = ToolLoop::new(provider.clone(), "mock-model");

        let text = agent
            .converse(ConverseRequest::new("system", "Research espresso"))
            .await
            .unwrap();

        assert_eq!(text, "Final report");
        assert_eq!(provider.call_count(), 1);
        let sent = &provider.requests()[0];
        assert_eq!(sent.system_prompt.as_deref(), Some("system"));
        assert_eq!(sent.max_tokens, Some(DEFAULT_MAX_OUTPUT_TOKENS));
        assert_eq!(sent.messages.len(), 1);
        assert_eq!(sent.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn stops_at_round_cap_without_error() {
        let provider = Arc::new(AlwaysToolProvider::new("lookup"));
        let tool = Arc::new(CountingTool::new("lookup"));
        let agent = ToolLoop::new(provider.clone(), "mock-model").with_max_rounds(4);

        let text = agent
            .converse(
                ConverseRequest::new("system", "go")
                    .with_tools(ToolRegistry::new().with(tool.clone())),
            )
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 4);
        // The last round's calls have no round left to report them in
        assert_eq!(tool.calls(), 3);
        assert_eq!(text, "still working");
    }

    #[tokio::test]
    async fn tool_then_answer_takes_two_sends() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("lookup", serde_json::json!({"query": "grinders"}))],
            "",
            "done",
        ));
        let tool = Arc::new(CountingTool::new("lookup"));
        let agent = ToolLoop::new(provider.clone(), "mock-model");

        let text = agent
            .converse(
                ConverseRequest::new("system", "go")
                    .with_tools(ToolRegistry::new().with(tool.clone())),
            )
            .await
            .unwrap();

        assert_eq!(text, "done");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(tool.calls(), 1);

        // Second send carries the assistant turn and one combined results turn
        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Assistant);
        assert_eq!(second.messages[2].role, Role::Tool);
        assert_eq!(second.messages[2].tool_results[0].content, "lookup: grinders");
    }

    #[tokio::test]
    async fn failing_tool_is_reported_not_raised() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("explode", serde_json::json!({}))],
            "",
            "recovered",
        ));
        let agent = ToolLoop::new(provider.clone(), "mock-model");

        let text = agent
            .converse(
                ConverseRequest::new("system", "go")
                    .with_tools(ToolRegistry::new().with(Arc::new(FailingTool))),
            )
            .await
            .unwrap();

        assert_eq!(text, "recovered");
        let result = &provider.requests()[1].messages[2].tool_results[0];
        assert!(result.is_error);
        assert!(result.content.starts_with("Error calling explode:"));
        assert!(result.content.contains("disk on fire"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_raised() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("teleport", serde_json::json!({}))],
            "",
            "ok",
        ));
        let agent = ToolLoop::new(provider.clone(), "mock-model");

        agent
            .converse(ConverseRequest::new("system", "go"))
            .await
            .unwrap();

        let result = &provider.requests()[1].messages[2].tool_results[0];
        assert_eq!(result.content, "Unknown function: teleport");
    }

    #[tokio::test]
    async fn same_round_results_keep_request_order() {
        let mut second = make_tool_call("lookup", serde_json::json!({"query": "b"}));
        second.id = "call_b".into();
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![
                make_tool_call("lookup", serde_json::json!({"query": "a"})),
                second,
            ],
            "searching",
            "done",
        ));
        let agent = ToolLoop::new(provider.clone(), "mock-model");

        agent
            .converse(
                ConverseRequest::new("system", "go")
                    .with_tools(ToolRegistry::new().with(Arc::new(CountingTool::new("lookup")))),
            )
            .await
            .unwrap();

        let results = &provider.requests()[1].messages[2].tool_results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "lookup: a");
        assert_eq!(results[1].call_id, "call_b");
        assert_eq!(results[1].content, "lookup: b");
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let provider = Arc::new(SequentialMockProvider::failing(ProviderError::ApiError {
            status_code: 500,
            message: "backend down".into(),
        }));
        let agent = ToolLoop::new(provider, "mock-model");

        let err = agent
            .converse(ConverseRequest::new("system", "go"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("backend down"));
    }

    #[tokio::test]
    async fn declarations_and_temperature_are_sent() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_text_response("x")]));
        let agent = ToolLoop::new(provider.clone(), "gemini-3-pro").with_max_tokens(512);

        agent
            .converse(
                ConverseRequest::new("system", "go")
                    .with_temperature(0.2)
                    .with_tools(ToolRegistry::new().with(Arc::new(CountingTool::new("lookup")))),
            )
            .await
            .unwrap();

        let sent = &provider.requests()[0];
        assert_eq!(sent.model, "gemini-3-pro");
        assert_eq!(sent.temperature, 0.2);
        assert_eq!(sent.max_tokens, Some(512));
        assert_eq!(sent.tools.len(), 1);
        assert_eq!(sent.tools[0].name, "lookup");
    }

    #[tokio::test]
    async fn round_cap_with_no_text_returns_empty() {
        let provider = Arc::new(SequentialMockProvider::new(vec![make_tool_call_response(
            vec![make_tool_call("lookup", serde_json::json!({}))],
            "",
        )]));
        let agent = ToolLoop::new(provider, "mock-model").with_max_rounds(1);

        let text = agent
            .converse(ConverseRequest::new("system", "go"))
            .await
            .unwrap();
        assert_eq!(text, "");
    }
}
