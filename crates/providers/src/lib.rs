//! LLM Provider implementations for ContentCrew.
//!
//! All providers implement the `contentcrew_core::Provider` trait.
//! `build_from_config` selects the configured backend.

pub mod anthropic;
pub mod gemini;
pub mod router;
pub mod translate;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use router::build_from_config;
