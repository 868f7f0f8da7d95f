//! Research: an SEO strategist searches the seed topic, then a topic-map
//! architect turns the findings into the topic map table.

use std::path::Path;

use chrono::NaiveDate;
use contentcrew_core::content::ClientContext;
use contentcrew_core::error::ProviderError;
use contentcrew_core::event::RunLog;

use super::Crew;
use crate::loop_runner::ConverseRequest;

pub const STRATEGIST_TEMPERATURE: f32 = 0.4;
pub const ARCHITECT_TEMPERATURE: f32 = 0.3;

const STRATEGIST_SYSTEM: &str = "\
You are a senior SEO research strategist. You map search landscapes for a living: \
who ranks, what they cover, what they miss, and which SERP features are up for grabs \
(featured snippets, People Also Ask, knowledge panels).
Every claim you make comes from a search you actually ran. Never invent data.
You have a web search tool. Use it often.";

const ARCHITECT_SYSTEM: &str = "\
You design topic cluster architectures. Pillar pages, clusters and supporting \
articles work together to build topical authority, and you keep that hierarchy tidy.
Aim for 1-3 pillars with 5-8 clusters each, then fill gaps with supporting topics. \
Never exceed 20 topics in total.
Your CSV is clean and production ready. You have a csv_writer tool and a web search tool.";

#[derive(Debug, Clone)]
pub struct ResearchInput<'a> {
    pub client: &'a ClientContext,
    pub seed_topic: &'a str,
    /// Where the architect must save the table.
    pub topic_map_path: &'a Path,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutput {
    pub report: String,
    pub summary: String,
}

pub fn research_task(seed: &str, industry: &str) -> String {
    format!(
        r#"Research the topic "{seed}" for the {industry} industry.

Run a web search for each of these:
- "{seed} best practices"
- "{seed} guide"
- "{seed} vs"
- "how to {seed}"
- "{seed} mistakes"
- "{seed} tools"
- "{seed} statistics"
- "{seed} tips for beginners"
- "{seed} trends 2026"
- long-tail variations and how/what/why questions
- commercial queries such as "best {seed}" and "{seed} services"
- comparisons ("{seed} vs X") and "{seed} case studies"

For every search note the top 3-5 ranking pages (title, URL, coverage), the gaps they leave, the SERP features shown and the content formats that rank.

Finish with one complete research report of everything you found."#
    )
}

pub fn topic_map_task(
    seed: &str,
    report: &str,
    client: &ClientContext,
    topic_map_path: &Path,
) -> String {
    format!(
        r#"Build the topic map for "{seed}" from this research.

RESEARCH:
{report}

Shape: 1-3 pillar topics, 5-8 clusters per pillar, supporting topics for the gaps. 15-20 topics in total.

Write one CSV row per topic with exactly these columns, in this order:
topic_level (pillar | cluster | supporting), parent_cluster (empty for pillars), topic_name, primary_keyword, secondary_keywords (3-5, pipe-separated), search_intent (informational | commercial | transactional | navigational), content_type (guide | listicle | how-to | comparison | case-study | pillar-page | FAQ | tutorial), word_count_min, word_count_max, target_entities (pipe-separated), questions_to_answer (3-5, pipe-separated), information_gain_opportunity, rag_optimization_notes, internal_link_targets (topic names from this map, pipe-separated), priority_score (1-10, 10 highest), competition_level (low | medium | high), serp_features_opportunity (pipe-separated, e.g. featured-snippet|people-also-ask).

Quote any field that contains a comma, pipe or quote. List pillars first, then sort by priority_score descending.

Save the CSV with the csv_writer tool to: {path}

Client:
{profile}

After saving, summarize: topic count per level, the top 5 priorities, the intent mix and the competition spread."#,
        path = topic_map_path.display(),
        profile = client.profile(),
    )
}

impl Crew {
    /// Run both research steps. The table itself is persisted by the
    /// architect through `csv_writer`.
    pub async fn research(
        &self,
        input: &ResearchInput<'_>,
        log: &RunLog,
    ) -> Result<ResearchOutput, ProviderError> {
        log.info("Research Agent", "Starting competitor audit & keyword research...");
        let report = self
            .agent
            .converse(
                ConverseRequest::new(
                    STRATEGIST_SYSTEM,
                    research_task(input.seed_topic, &input.client.industry),
                )
                .with_tools(self.toolkit.research_registry())
                .with_temperature(STRATEGIST_TEMPERATURE),
            )
            .await?;
        log.info(
            "Research Agent",
            format!("Research complete — {} chars of findings", report.len()),
        );

        log.info("Topic Map Agent", "Building topic map from research data...");
        let summary = self
            .agent
            .converse(
                ConverseRequest::new(
                    ARCHITECT_SYSTEM,
                    topic_map_task(input.seed_topic, &report, input.client, input.topic_map_path),
                )
                .with_tools(self.toolkit.topic_map_registry())
                .with_temperature(ARCHITECT_TEMPERATURE),
            )
            .await?;
        log.info("Topic Map Agent", "Topic map step finished");

        tracing::debug!(date = %input.date, seed = input.seed_topic, "Research finished");
        Ok(ResearchOutput { report, summary })
    }
}
