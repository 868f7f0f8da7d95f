//! The agents of the content crew.
//!
//! - [`ToolLoop`]: the conversational tool-use loop. Sends the history to the
//!   model, runs requested tools, reports results, repeats until the model
//!   answers in text or the round cap is reached.
//! - [`QaController`]: write once, review up to N times, feeding each failed
//!   review back in as the next draft.
//! - [`Crew`]: the research, brief and production roles built on both.

pub mod loop_runner;
pub mod qa;
pub mod roles;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use loop_runner::{ConverseRequest, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MAX_ROUNDS, ToolLoop};
pub use qa::{PassPolicy, QaController, QaOutcome, QaState, ReviewRound};
pub use roles::{ArticleSpec, BriefInput, Crew, ProductionInput, ResearchInput, ResearchOutput};
