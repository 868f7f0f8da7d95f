//! Production: a writer drafts the article, then a QA editor reviews and
//! rewrites it under the QA controller until it passes or is flagged.

use std::path::Path;

use chrono::NaiveDate;
use contentcrew_core::content::{ClientContext, ContentBrief, SearchIntent, TopicMapEntry};
use contentcrew_core::error::ProviderError;
use contentcrew_core::event::RunLog;
use contentcrew_tools::banned_phrases::BANNED_PHRASES;

use super::Crew;
use crate::loop_runner::ConverseRequest;
use crate::qa::{QaOutcome, ReviewRound};

pub const WRITER_TEMPERATURE: f32 = 0.7;
pub const QA_TEMPERATURE: f32 = 0.2;

const QA_EDITOR_SYSTEM: &str = "\
You are a content QA editor and SEO compliance specialist. Meta tag lengths, keyword \
placement, banned phrases and structure problems do not get past you, and your reports \
tell the writer exactly what to fix.
Tools: banned_phrase_checker scans for banned cliché phrases; file_writer saves the \
final article with its QA report appended.";

/// Topic data the writer and reviewer need, with fallbacks for briefs
/// whose topic is no longer in the map.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSpec {
    pub topic_name: String,
    pub primary_keyword: String,
    pub secondary_keywords: String,
    pub content_type: String,
    pub search_intent: String,
    pub word_count_min: u32,
    pub word_count_max: u32,
    pub target_entities: String,
    pub internal_link_targets: String,
}

impl ArticleSpec {
    pub fn new(brief: &ContentBrief, entry: Option<&TopicMapEntry>) -> Self {
        Self {
            topic_name: brief.topic_name.clone(),
            primary_keyword: entry
                .map(|e| e.primary_keyword.clone())
                .unwrap_or_else(|| brief.topic_name.clone()),
            secondary_keywords: entry.map(|e| e.secondary_keywords.clone()).unwrap_or_default(),
            content_type: brief.content_type.to_string(),
            search_intent: entry
                .map(|e| e.search_intent)
                .unwrap_or(SearchIntent::Informational)
                .to_string(),
            word_count_min: brief.word_count_min,
            word_count_max: brief.word_count_max,
            target_entities: entry.map(|e| e.target_entities.clone()).unwrap_or_default(),
            internal_link_targets: entry
                .map(|e| e.internal_link_targets.clone())
                .unwrap_or_default(),
        }
    }

    pub fn word_count_target(&self) -> u32 {
        self.word_count_min.midpoint(self.word_count_max)
    }
}

#[derive(Debug, Clone)]
pub struct ProductionInput<'a> {
    pub client: &'a ClientContext,
    pub spec: ArticleSpec,
    pub brief_body: &'a str,
    /// Where the QA editor must save the article.
    pub output_path: &'a Path,
    pub date: NaiveDate,
}

pub fn writer_system(client: &ClientContext) -> String {
    let banned: Vec<String> = BANNED_PHRASES.iter().map(|p| format!("\"{p}\"")).collect();
    format!(
        "You are an SEO content writer with over a thousand first-page articles behind you. Your prose is natural and free of stock AI phrasing.
Never use any of these phrases: {banned}.

House rules:
- Active voice, varied sentence length
- At most 4 sentences per paragraph
- Inverted pyramid in every section, key information first
- Every H2 stands on its own (no \"as mentioned above\")
- Bold each entity the first time it appears
- Internal links as [anchor text](link-target: Topic Name)
- Image placeholders as ![descriptive alt text](image-placeholder)
- Comparisons go in tables, never in inline lists of 4 or more items
- The first paragraph holds the primary keyword, a clear definition and an extractable answer in 50-80 words

Client:
- Client: {}
- Brand Voice: {}
- Brand Tone: {}
- Style: {}",
        client.client_name,
        client.brand_voice,
        client.brand_tone,
        client.style_preferences,
        banned = banned.join(", "),
    )
}

pub fn writer_task(spec: &ArticleSpec, brief_body: &str, client: &ClientContext, date: NaiveDate) -> String {
    format!(
        r#"Write the complete, publication-ready article for this approved brief.

Topic: {topic}
Primary Keyword: {pk}
Secondary Keywords: {sk}
Content Type: {ctype}
Word Count Target: {min}-{max} words
Search Intent: {intent}
Target Entities: {entities}
Internal Link Targets: {links}

Brief:
{brief_body}

Use exactly this structure:

---
meta_title: "[from the brief, at most 60 chars, keyword within the first 30]"
meta_description: "[from the brief, at most 155 chars]"
url_slug: "[from the brief]"
primary_keyword: "{pk}"
word_count: [actual count]
date_created: "{date}"
client: "{client}"
status: "draft"
---

# [H1 containing the primary keyword, different from meta_title]

[Opening paragraph of 50-80 words: keyword, direct answer, inverted pyramid]

## [H2 sections following the brief outline]

## Frequently Asked Questions
### [Question from the brief]
[40-60 word answer, direct answer first]

## Key Takeaways
- [5 actionable bullet points]

Write the whole article now, about {target} words."#,
        topic = spec.topic_name,
        pk = spec.primary_keyword,
        sk = spec.secondary_keywords,
        ctype = spec.content_type,
        min = spec.word_count_min,
        max = spec.word_count_max,
        intent = spec.search_intent,
        entities = spec.target_entities,
        links = spec.internal_link_targets,
        client = client.client_name,
        target = spec.word_count_target(),
    )
}

pub fn qa_task(spec: &ArticleSpec, round: &ReviewRound, output_path: &Path, date: NaiveDate) -> String {
    format!(
        r#"Run the full QA protocol on this article for "{topic}".
Primary Keyword: {pk}
Word Count Range: {min}-{max}
Target Entities: {entities}
Internal Link Targets: {links}
Secondary Keywords: {sk}
Content Type: {ctype}
Search Intent: {intent}

ARTICLE TO REVIEW:
{draft}

Scan the article with the banned_phrase_checker tool.

Mark every item PASS ✅ or FAIL ❌.

STRUCTURE & INTENT
- [ ] Content matches the {intent} search intent
- [ ] Inverted pyramid: the key answer is in the first paragraph
- [ ] Every H2 section is self-contained
- [ ] Key Takeaways present with exactly 5 items
- [ ] FAQ section present with 4-6 questions

SEO & TECHNICAL
- [ ] Meta title present, under 60 chars, contains "{pk}"
- [ ] Meta description present, under 155 chars, contains the keyword
- [ ] URL slug present, clean and keyword-focused
- [ ] Primary keyword in the H1, the first paragraph and 2+ H2 headings
- [ ] Secondary keywords distributed: {sk}
- [ ] Internal link placeholders for: {links}
- [ ] Alt text on every image placeholder
- [ ] Word count within {min}-{max}

OPTIMIZATION
- [ ] Information gain element present
- [ ] Comparison table present if the content type is "comparison"
- [ ] FAQ answers are 40-60 words and snippet-ready
- [ ] Target entities mentioned and bolded: {entities}
- [ ] No banned phrases (banned_phrase_checker)

If every item passes: append a QA Report table to the article, add the line
`QA Status: PASSED | Attempts: {attempt}/{max_attempts} | Date: {date}`
and save the article with its report to: {path}

If any item fails: return the REWRITTEN article with the fixes applied and re-check it. Items still failing after {max_attempts} attempts are marked ⚠️. End with the line
`QA Status: FLAGGED | Attempts: {attempt}/{max_attempts} | Date: {date}`
and save the article with its report to: {path}

Always save the final article and QA report with the file_writer tool."#,
        topic = spec.topic_name,
        pk = spec.primary_keyword,
        min = spec.word_count_min,
        max = spec.word_count_max,
        entities = spec.target_entities,
        links = spec.internal_link_targets,
        sk = spec.secondary_keywords,
        ctype = spec.content_type,
        intent = spec.search_intent,
        draft = round.draft,
        attempt = round.attempt,
        max_attempts = round.max_attempts,
        path = output_path.display(),
    )
}

impl Crew {
    /// Write one article and run it through QA.
    pub async fn produce(
        &self,
        input: &ProductionInput<'_>,
        log: &RunLog,
    ) -> Result<QaOutcome, ProviderError> {
        let topic = input.spec.topic_name.as_str();

        let write = || async {
            log.info("Writer Agent", format!("Writing article: {topic}"));
            self.agent
                .converse(
                    ConverseRequest::new(
                        writer_system(input.client),
                        writer_task(&input.spec, input.brief_body, input.client, input.date),
                    )
                    .with_temperature(WRITER_TEMPERATURE),
                )
                .await
        };

        let review = |round: ReviewRound| async move {
            log.info(
                "QA Agent",
                format!("QA attempt {}/{} for: {topic}", round.attempt, round.max_attempts),
            );
            let text = self
                .agent
                .converse(
                    ConverseRequest::new(
                        QA_EDITOR_SYSTEM,
                        qa_task(&input.spec, &round, input.output_path, input.date),
                    )
                    .with_tools(self.toolkit.qa_registry())
                    .with_temperature(QA_TEMPERATURE),
                )
                .await?;
            if !self.qa.policy().is_passed(&text) {
                let next = if round.attempt < round.max_attempts {
                    "retrying"
                } else {
                    "finalizing"
                };
                log.warning(
                    "QA Agent",
                    format!("QA attempt {} flagged issues, {next}", round.attempt),
                );
            }
            Ok(text)
        };

        let outcome = self.qa.run(write, review).await?;
        if outcome.passed {
            log.success("QA Agent", format!("✅ QA PASSED for: {topic}"));
        } else {
            log.warning(
                "QA Agent",
                format!("⚠️ QA FLAGGED after {} attempts: {topic}", outcome.attempts),
            );
        }
        Ok(outcome)
    }
}
