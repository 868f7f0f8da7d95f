//! Error types for the ContentCrew domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all ContentCrew operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Topic map errors ---
    #[error("Topic map error: {0}")]
    TopicMap(#[from] TopicMapError),

    // --- QA errors ---
    #[error("QA error: {0}")]
    Qa(#[from] QaError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Filesystem ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Failures reading a topic map table.
///
/// Row numbers are 1-based and count the header as row 1, so they match what
/// a spreadsheet shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicMapError {
    #[error("topic map is empty")]
    Empty,

    #[error("topic map header is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: unterminated quoted field")]
    UnterminatedQuote { row: usize },

    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QaError {
    #[error("max QA attempts must be at least 1")]
    ZeroAttempts,
}

/// Failures of a pipeline run or of an operator request against one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run {run_id} is not waiting for approval (phase: {phase})")]
    NotAtCheckpoint { run_id: String, phase: String },

    #[error(
        "No topics found in the topic map. Check that the topic map CSV exists and has rows, then approve again."
    )]
    NoTopics,

    #[error("No topic map has been written for this run yet")]
    NoTopicMap,

    #[error("Phase {phase} error: {message}")]
    Phase { phase: u8, message: String },
}
