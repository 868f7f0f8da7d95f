//! Brief writing: one content strategist conversation per topic.

use std::path::Path;

use contentcrew_core::content::{ClientContext, TopicMapEntry};
use contentcrew_core::error::ProviderError;
use contentcrew_core::event::RunLog;

use super::Crew;
use crate::loop_runner::ConverseRequest;

pub const BRIEF_TEMPERATURE: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct BriefInput<'a> {
    pub client: &'a ClientContext,
    pub entry: &'a TopicMapEntry,
    /// Where the strategist must save the brief.
    pub output_path: &'a Path,
}

pub fn brief_system(client: &ClientContext) -> String {
    format!(
        "You are a content strategist whose briefs are detailed enough that a writer can produce a publication-ready piece without a single follow-up question.
You know how to structure content for featured snippets and entity-based search, and how to add information competitors do not have.
Before outlining anything you look at what already ranks.

Client context for this project:
{}

You have web search and file writing tools.",
        client.profile()
    )
}

pub fn brief_task(entry: &TopicMapEntry, output_path: &Path) -> String {
    let e = entry;
    format!(
        r#"Write a content brief for this topic.

Topic: {topic}
Primary Keyword: {pk}
Secondary Keywords: {sk}
Search Intent: {intent}
Content Type: {ctype}
Word Count: {min}-{max} words
Target Entities: {entities}
Questions to Answer: {questions}
Information Gain Opportunity: {gain}
RAG Optimization Notes: {rag}
Internal Link Targets: {links}

1. Search for 2-3 articles that rank for this topic and note what they cover and miss.
2. Write the brief with this frontmatter and every section below:

---
topic_name: "{topic}"
primary_keyword: "{pk}"
secondary_keywords: "{sk}"
content_type: "{ctype}"
word_count_min: {min}
word_count_max: {max}
search_intent: "{intent}"
target_entities: "{entities}"
---

## Overview
## Competitor Analysis
## Writing Style Guidance
## Heading Hierarchy & Section Guide
(H1 title, then each H2 with what to cover, key points and target length, H3s where needed)
## Information Gain Strategy
## RAG Optimization
## Questions to Answer
(each question with guidance on the answer format)
## SEO Requirements
(primary keyword placement, secondary keyword distribution, internal links, image placeholders)

3. Save the brief with the file_writer tool to: {path}"#,
        topic = e.topic_name,
        pk = e.primary_keyword,
        sk = e.secondary_keywords,
        intent = e.search_intent,
        ctype = e.content_type,
        min = e.word_count_min,
        max = e.word_count_max,
        entities = e.target_entities,
        questions = e.questions_to_answer,
        gain = e.information_gain_opportunity,
        rag = e.rag_optimization_notes,
        links = e.internal_link_targets,
        path = output_path.display(),
    )
}

impl Crew {
    /// Generate one brief. The strategist saves the file itself.
    pub async fn brief(&self, input: &BriefInput<'_>, log: &RunLog) -> Result<String, ProviderError> {
        log.info(
            "Brief Agent",
            format!("Creating brief for: {}", input.entry.topic_name),
        );
        let text = self
            .agent
            .converse(
                ConverseRequest::new(
                    brief_system(input.client),
                    brief_task(input.entry, input.output_path),
                )
                .with_tools(self.toolkit.brief_registry())
                .with_temperature(BRIEF_TEMPERATURE),
            )
            .await?;
        log.info(
            "Brief Agent",
            format!("Brief complete for: {}", input.entry.topic_name),
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentcrew_core::content::ContentType;

    #[test]
    fn task_carries_entry_fields_and_path() {
        let mut entry = TopicMapEntry::new("Burr Grinders");
        entry.content_type = ContentType::Comparison;
        entry.questions_to_answer = "Flat or conical?|How long do burrs last?".into();

        let task = brief_task(&entry, Path::new("/out/briefs/Burr Grinders - 2026-01-01.md"));
        assert!(task.contains("Content Type: comparison"));
        assert!(task.contains("Word Count: 1500-2500 words"));
        assert!(task.contains("Flat or conical?|How long do burrs last?"));
        assert!(task.contains("file_writer tool to: /out/briefs/Burr Grinders - 2026-01-01.md"));
    }

    #[test]
    fn system_prompt_includes_client_profile() {
        let client = ClientContext {
            client_name: "Bean Co".into(),
            brand_voice: "Warm".into(),
            ..ClientContext::default()
        };
        let system = brief_system(&client);
        assert!(system.contains("Client: Bean Co"));
        assert!(system.contains("Brand voice: Warm"));
    }
}
