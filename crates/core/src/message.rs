//! Conversation history types.
//!
//! A conversational tool-use exchange is a list of these messages:
//! the user prompt, then alternating assistant turns (text and/or tool
//! requests) and tool-result turns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The host application, speaking for the operator
    User,
    /// The model
    Assistant,
    /// Results of tool calls the model asked for
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// Results for every call of the previous assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<MessageToolResult>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content.into());
        msg.tool_calls = calls;
        msg
    }

    /// Create the combined results turn for one round of tool calls.
    pub fn tool_results(results: Vec<MessageToolResult>) -> Self {
        let mut msg = Self::new(Role::Tool, String::new());
        msg.tool_results = results;
        msg
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as supplied by the model
    pub arguments: serde_json::Value,

    /// Opaque provider token that must be echoed back with this call
    /// (Gemini thought signatures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl MessageToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            signature: None,
        }
    }
}

/// The outcome of one tool call, reported back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolResult {
    /// The call this result answers
    pub call_id: String,

    /// Name of the tool that was called
    pub name: String,

    /// Result text (errors are rendered as text too)
    pub content: String,

    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Research espresso grinders");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Research espresso grinders");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn results_turn_carries_every_result() {
        let msg = Message::tool_results(vec![
            MessageToolResult {
                call_id: "c1".into(),
                name: "serper_search".into(),
                content: "1. [A](https://a)".into(),
                is_error: false,
            },
            MessageToolResult {
                call_id: "c2".into(),
                name: "file_writer".into(),
                content: "Error calling file_writer: disk full".into(),
                is_error: true,
            },
        ]);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_results.len(), 2);
        assert!(msg.tool_results[1].is_error);
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let json = serde_json::to_value(Message::assistant("done")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_results").is_none());
        assert_eq!(json["role"], "assistant");
    }
}
