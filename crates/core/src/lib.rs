//! # ContentCrew Core
//!
//! Domain types, traits, and error definitions for the ContentCrew content
//! pipeline. This crate has **no framework dependencies**: it defines the
//! domain model that the provider, tool, agent and pipeline crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping model providers via configuration
//! - Testing the tool-use loop with scripted providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod content;
pub mod error;
pub mod event;
pub mod layout;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;
pub mod topic_map;

// Re-export key types at crate root for ergonomics
pub use content::{
    Article, ClientContext, CompetitionLevel, ContentBrief, ContentType, QaStatus, SearchIntent,
    TopicLevel, TopicMapEntry,
};
pub use error::{
    Error, PipelineError, ProviderError, QaError, Result, ToolError, TopicMapError,
};
pub use event::{LogEvent, LogLevel, RunLog};
pub use layout::OutputLayout;
pub use message::{Message, MessageToolCall, MessageToolResult, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use schema::{FunctionDeclaration, Schema, SchemaType};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
