//! Markdown index files written at the end of phases 2 and 3.

use chrono::NaiveDate;

use crate::state::PipelineState;

const BRIEF_TABLE: [&str; 2] = [
    "\n| # | Topic | Priority | Type | Word Count |",
    "|---|-------|----------|------|------------|",
];

const PRODUCTION_TABLE: [&str; 2] = [
    "\n| # | Topic | QA Status | Attempts | Flagged Items |",
    "|---|-------|-----------|----------|---------------|",
];

fn header(title: &str, state: &PipelineState, date: NaiveDate) -> Vec<String> {
    vec![
        format!("# {title} — {}", state.client.client_name),
        format!("\nGenerated: {}", date.format("%Y-%m-%d")),
        format!("Seed Topic: {}", state.seed_topic),
    ]
}

/// Briefs table, highest priority first.
pub fn brief_index(state: &PipelineState, date: NaiveDate) -> String {
    let mut lines = header("Content Brief Index", state, date);
    lines.extend(BRIEF_TABLE.iter().map(|s| s.to_string()));
    for (i, brief) in state.briefs_by_priority().into_iter().enumerate() {
        lines.push(format!(
            "| {} | {} | {} | {} | {}-{} |",
            i + 1,
            brief.topic_name,
            brief.priority_score,
            brief.content_type,
            brief.word_count_min,
            brief.word_count_max,
        ));
    }
    lines.join("\n")
}

/// Articles table in production order.
pub fn production_index(state: &PipelineState, date: NaiveDate, max_attempts: u32) -> String {
    let mut lines = header("Production Index", state, date);
    lines.extend(PRODUCTION_TABLE.iter().map(|s| s.to_string()));
    for (i, article) in state.articles.iter().enumerate() {
        let flagged = if article.flagged_items.is_empty() {
            "—".to_string()
        } else {
            article.flagged_items.join(", ")
        };
        lines.push(format!(
            "| {} | {} | {} | {}/{} | {} |",
            i + 1,
            article.topic_name,
            article.qa_status,
            article.qa_attempts,
            max_attempts,
            flagged,
        ));
    }
    lines.join("\n")
}

/// Closing report for a finished run.
pub fn final_report(state: &PipelineState) -> String {
    let summary = state.summary();
    let mut lines = vec![
        "Production Summary:".to_string(),
        format!("  Total articles: {}", summary.total),
        format!("  QA Passed: {}", summary.passed),
        format!("  Flagged: {}", summary.flagged),
    ];

    if summary.flagged > 0 {
        lines.push(String::new());
        lines.push("Flagged articles requiring review:".to_string());
        for article in state.flagged_articles() {
            lines.push(format!("  - {} (Attempts: {})", article.topic_name, article.qa_attempts));
        }
    }

    lines.push(String::new());
    lines.push(format!("All deliverables saved to: {}", state.layout.root().display()));
    for (label, path) in [
        ("Topic Map", &state.topic_map_path),
        ("Brief Index", &state.brief_index_path),
        ("Production Index", &state.production_index_path),
    ] {
        let shown = path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("  {label}: {shown}"));
    }
    lines.join("\n")
}
