//! Scripted providers and tools for tests.
//!
//! Enabled for this crate's own tests and, through the `test-helpers`
//! feature, for the pipeline and CLI test suites.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use contentcrew_core::error::{ProviderError, ToolError};
use contentcrew_core::message::{Message, MessageToolCall};
use contentcrew_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use contentcrew_core::schema::Schema;
use contentcrew_core::tool::{Tool, ToolResult};

/// A mock provider that returns a sequence of scripted responses and
/// records every request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, thought),
            make_text_response(answer),
        ])
    }

    /// A provider whose first call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();

        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }

        requests.push(request);
        responses[call].clone()
    }
}

/// Always asks for the same tool, alongside some text.
pub struct AlwaysToolProvider {
    tool: String,
    calls: AtomicUsize,
}

impl AlwaysToolProvider {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for AlwaysToolProvider {
    fn name(&self) -> &str {
        "always_tool"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut call = make_tool_call(&self.tool, serde_json::json!({"query": format!("q{n}")}));
        call.id = format!("call_{n}");
        Ok(make_tool_call_response(vec![call], "still working"))
    }
}

type Responder = dyn Fn(&ProviderRequest) -> ProviderResponse + Send + Sync;

/// Answers each request with a closure, for flows whose call order
/// depends on content (whole pipeline runs).
pub struct FnProvider {
    respond: Box<Responder>,
    calls: AtomicUsize,
}

impl FnProvider {
    pub fn new(respond: impl Fn(&ProviderRequest) -> ProviderResponse + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FnProvider {
    fn name(&self) -> &str {
        "fn_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.respond)(&request))
    }
}

/// Echoes `"<name>: <query>"` and counts invocations.
pub struct CountingTool {
    name: String,
    calls: AtomicUsize,
}

impl CountingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counts calls"
    }

    fn parameters(&self) -> Schema {
        Schema::object().property("query", Schema::string("Query"))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = arguments["query"].as_str().unwrap_or_default();
        Ok(ToolResult::ok(format!("{}: {query}", self.name)))
    }
}

/// Always fails with an execution error.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters(&self) -> Schema {
        Schema::object()
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "explode".into(),
            reason: "disk on fire".into(),
        })
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional text.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_calls(thought, tool_calls),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall::new(format!("call_{name}"), name, args)
}

/// Plays every role of a whole pipeline run by recognizing the task prompt.
///
/// The architect saves `topic_map_csv` with `csv_writer`, strategists save a
/// brief with `file_writer`, and reviewers save the article then answer with
/// a status line that passes only when `qa_passes` is set.
pub fn crew_script(topic_map_csv: String, qa_passes: bool) -> FnProvider {
    FnProvider::new(move |request| {
        let task = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let answered = request
            .messages
            .last()
            .is_some_and(|m| !m.tool_results.is_empty());

        if task.starts_with("Build the topic map") {
            if answered {
                return make_text_response("Topic map saved.");
            }
            let path = line_after(task, "csv_writer tool to: ");
            return make_tool_call_response(
                vec![make_tool_call(
                    "csv_writer",
                    serde_json::json!({"csv_content": topic_map_csv, "output_path": path}),
                )],
                "",
            );
        }
        if task.starts_with("Write a content brief") {
            if answered {
                return make_text_response("Brief saved.");
            }
            let topic = line_after(task, "Topic: ");
            let path = line_after(task, "file_writer tool to: ");
            return make_tool_call_response(
                vec![make_tool_call(
                    "file_writer",
                    serde_json::json!({"content": format!("# Brief: {topic}\n\n## Overview"), "output_path": path}),
                )],
                "",
            );
        }
        if task.starts_with("Run the full QA protocol") {
            let status = if qa_passes { "PASSED" } else { "FLAGGED" };
            if answered {
                return make_text_response(&format!(
                    "# Article\n\nBody text.\n- Word count ❌ short\nQA Status: {status}"
                ));
            }
            let path = line_after(task, "report to: ");
            return make_tool_call_response(
                vec![make_tool_call(
                    "file_writer",
                    serde_json::json!({"content": "# Article\n\nBody text.", "output_path": path}),
                )],
                "",
            );
        }
        if task.starts_with("Write the complete") {
            return make_text_response("# Article\n\nBody text.");
        }
        make_text_response("Research report.")
    })
}

fn line_after(text: &str, marker: &str) -> String {
    text.split_once(marker)
        .map(|(_, rest)| rest.lines().next().unwrap_or_default().trim().to_string())
        .unwrap_or_default()
}
