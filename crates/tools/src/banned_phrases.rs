//! Banned phrase checker: flags stock AI phrasing in a draft.

use async_trait::async_trait;
use contentcrew_core::error::ToolError;
use contentcrew_core::schema::Schema;
use contentcrew_core::tool::{Tool, ToolResult, require_str};

/// Phrases an article must not contain. Matching ignores case.
pub const BANNED_PHRASES: [&str; 22] = [
    "In today's digital landscape",
    "game-changer",
    "unlock",
    "leverage",
    "dive in",
    "deep dive",
    "navigate",
    "elevate",
    "robust",
    "It's important to note",
    "It's worth noting",
    "In conclusion",
    "Without further ado",
    "At the end of the day",
    "seamless",
    "seamlessly",
    "cutting-edge",
    "revolutionary",
    "empower",
    "empowering",
    "holistic",
    "synergy",
];

const CONTEXT_CHARS: usize = 30;

/// One occurrence of a banned phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub phrase: &'static str,
    pub context: String,
}

/// Find every occurrence of every banned phrase, overlapping ones included.
pub fn find_violations(content: &str) -> Vec<Violation> {
    // ASCII lowering keeps byte offsets aligned with `content`.
    let haystack = content.to_ascii_lowercase();
    let mut violations = Vec::new();

    for phrase in BANNED_PHRASES {
        let needle = phrase.to_ascii_lowercase();
        let mut start = 0;
        while let Some(pos) = haystack[start..].find(&needle) {
            let idx = start + pos;
            let from = floor_boundary(content, idx.saturating_sub(CONTEXT_CHARS));
            let to = ceil_boundary(content, (idx + needle.len() + CONTEXT_CHARS).min(content.len()));
            violations.push(Violation {
                phrase,
                context: content[from..to].replace('\n', " "),
            });
            start = ceil_boundary(content, idx + 1);
        }
    }
    violations
}

/// Render the checker report handed back to the model.
pub fn report(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "PASSED: No banned phrases found in the content.".into();
    }
    let lines: Vec<String> = violations
        .iter()
        .map(|v| format!("  - \"{}\" found: \"...{}...\"", v.phrase, v.context))
        .collect();
    format!(
        "FAILED: Found {} banned phrase violation(s):\n{}",
        violations.len(),
        lines.join("\n")
    )
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

pub struct BannedPhraseTool;

#[async_trait]
impl Tool for BannedPhraseTool {
    fn name(&self) -> &str {
        "banned_phrase_checker"
    }

    fn description(&self) -> &str {
        "Check article content for banned AI cliché phrases. Returns PASSED or FAILED with each violation and its surrounding text."
    }

    fn parameters(&self) -> Schema {
        Schema::object()
            .property("content", Schema::string("The full article content to check"))
            .require("content")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let content = require_str(&arguments, "content")?;
        let violations = find_violations(content);
        tracing::debug!(violations = violations.len(), "Banned phrase check");
        let output = report(&violations);
        Ok(if violations.is_empty() {
            ToolResult::ok(output)
        } else {
            ToolResult::failed(output)
        })
    }
}
