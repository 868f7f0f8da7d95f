//! Content pipeline data model: client profile, topic map rows, briefs and
//! articles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Enums whose text form appears in topic map cells and prompts.
///
/// Parsing ignores case and treats spaces, underscores and hyphens alike;
/// `Display` yields the canonical spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let wanted = normalize_label(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize_label(v.as_str()) == wanted)
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }
    };
}

/// Lower-case with runs of spaces and underscores folded into `-`.
fn normalize_label(s: &str) -> String {
    s.split(|c: char| c == ' ' || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

text_enum!(
    /// Position of a topic in the pillar/cluster hierarchy.
    TopicLevel {
        Pillar => "pillar",
        Cluster => "cluster",
        #[default]
        Supporting => "supporting",
    }
);

text_enum!(
    SearchIntent {
        #[default]
        Informational => "informational",
        Commercial => "commercial",
        Transactional => "transactional",
        Navigational => "navigational",
    }
);

text_enum!(
    ContentType {
        #[default]
        Guide => "guide",
        Listicle => "listicle",
        HowTo => "how-to",
        Comparison => "comparison",
        CaseStudy => "case-study",
        PillarPage => "pillar-page",
        Faq => "FAQ",
        Tutorial => "tutorial",
    }
);

text_enum!(
    CompetitionLevel {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
    }
);

text_enum!(
    /// Outcome of the QA gate for one article.
    QaStatus {
        #[default]
        Pending => "pending",
        Passed => "PASSED",
        Flagged => "FLAGGED",
    }
);

/// Client information gathered before a run starts. Read by every phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientContext {
    pub client_name: String,
    pub business_summary: String,
    pub brand_voice: String,
    pub brand_tone: String,
    pub style_preferences: String,
    pub industry: String,
    pub competitive_landscape: String,
}

impl ClientContext {
    /// Multi-line profile block used in prompts.
    pub fn profile(&self) -> String {
        format!(
            "Client: {}\nBusiness: {}\nIndustry: {}\nBrand voice: {}\nBrand tone: {}\nStyle preferences: {}\nCompetitive landscape: {}",
            self.client_name,
            self.business_summary,
            self.industry,
            self.brand_voice,
            self.brand_tone,
            self.style_preferences,
            self.competitive_landscape,
        )
    }
}

pub const DEFAULT_WORD_COUNT_MIN: u32 = 1500;
pub const DEFAULT_WORD_COUNT_MAX: u32 = 2500;
pub const DEFAULT_PRIORITY: u8 = 5;

/// One row of the topic map. Multi-valued fields stay raw pipe-delimited
/// strings; use [`split_list`] to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMapEntry {
    pub topic_level: TopicLevel,
    pub parent_cluster: String,
    pub topic_name: String,
    pub primary_keyword: String,
    pub secondary_keywords: String,
    pub search_intent: SearchIntent,
    pub content_type: ContentType,
    pub word_count_min: u32,
    pub word_count_max: u32,
    pub target_entities: String,
    pub questions_to_answer: String,
    pub information_gain_opportunity: String,
    pub rag_optimization_notes: String,
    pub internal_link_targets: String,
    pub priority_score: u8,
    pub competition_level: CompetitionLevel,
    pub serp_features_opportunity: String,
}

impl TopicMapEntry {
    /// A supporting topic with default metadata.
    pub fn new(topic_name: impl Into<String>) -> Self {
        let topic_name = topic_name.into();
        Self {
            topic_level: TopicLevel::default(),
            parent_cluster: String::new(),
            primary_keyword: topic_name.clone(),
            topic_name,
            secondary_keywords: String::new(),
            search_intent: SearchIntent::default(),
            content_type: ContentType::default(),
            word_count_min: DEFAULT_WORD_COUNT_MIN,
            word_count_max: DEFAULT_WORD_COUNT_MAX,
            target_entities: String::new(),
            questions_to_answer: String::new(),
            information_gain_opportunity: String::new(),
            rag_optimization_notes: String::new(),
            internal_link_targets: String::new(),
            priority_score: DEFAULT_PRIORITY,
            competition_level: CompetitionLevel::default(),
            serp_features_opportunity: String::new(),
        }
    }

    /// Check the row invariants: positive word counts, `min <= max`,
    /// priority in 1..=10.
    pub fn validate(&self) -> Result<(), String> {
        if self.word_count_min == 0 || self.word_count_max == 0 {
            return Err("word counts must be positive".into());
        }
        if self.word_count_min > self.word_count_max {
            return Err(format!(
                "word_count_min {} exceeds word_count_max {}",
                self.word_count_min, self.word_count_max
            ));
        }
        if !(1..=10).contains(&self.priority_score) {
            return Err(format!("priority_score {} is outside 1-10", self.priority_score));
        }
        Ok(())
    }

    pub fn word_count_target(&self) -> u32 {
        self.word_count_min.midpoint(self.word_count_max)
    }
}

/// Split a pipe-delimited cell into trimmed, non-empty items.
pub fn split_list(cell: &str) -> Vec<&str> {
    cell.split('|').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Metadata for a generated brief. The body lives in `filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBrief {
    pub topic_name: String,
    pub filename: String,
    pub priority_score: u8,
    pub content_type: ContentType,
    pub word_count_min: u32,
    pub word_count_max: u32,
}

impl ContentBrief {
    pub fn for_entry(entry: &TopicMapEntry, filename: impl Into<String>) -> Self {
        Self {
            topic_name: entry.topic_name.clone(),
            filename: filename.into(),
            priority_score: entry.priority_score,
            content_type: entry.content_type,
            word_count_min: entry.word_count_min,
            word_count_max: entry.word_count_max,
        }
    }
}

/// Metadata for a produced article. Only the QA fields change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub topic_name: String,
    pub filename: String,
    pub word_count: usize,
    pub qa_status: QaStatus,
    pub qa_attempts: u32,
    pub flagged_items: Vec<String>,
}

impl Article {
    pub fn new(topic_name: impl Into<String>, filename: impl Into<String>, text: &str) -> Self {
        Self {
            topic_name: topic_name.into(),
            filename: filename.into(),
            word_count: word_count(text),
            qa_status: QaStatus::Pending,
            qa_attempts: 0,
            flagged_items: Vec::new(),
        }
    }

    /// Record the QA outcome; flagged items are pulled from the report.
    pub fn record_qa(&mut self, passed: bool, attempts: u32, report: &str) {
        self.qa_status = if passed { QaStatus::Passed } else { QaStatus::Flagged };
        self.qa_attempts = attempts;
        self.flagged_items = flagged_items(report);
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Checklist lines the reviewer marked as failing or needing attention.
pub fn flagged_items(report: &str) -> Vec<String> {
    report
        .lines()
        .map(str::trim)
        .filter(|line| line.contains('❌') || line.contains("⚠️"))
        .map(|line| line.trim_start_matches(['-', '*', ' ']).trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("PILLAR".parse::<TopicLevel>().unwrap(), TopicLevel::Pillar);
        assert_eq!("faq".parse::<ContentType>().unwrap(), ContentType::Faq);
        assert_eq!(" How-To ".parse::<ContentType>().unwrap(), ContentType::HowTo);
        assert!("whitepaper".parse::<ContentType>().is_err());
    }

    #[test]
    fn enums_accept_spaced_and_underscored_spellings() {
        assert_eq!("case study".parse::<ContentType>().unwrap(), ContentType::CaseStudy);
        assert_eq!("How_To".parse::<ContentType>().unwrap(), ContentType::HowTo);
        assert_eq!("pillar  page".parse::<ContentType>().unwrap(), ContentType::PillarPage);
        assert_eq!(ContentType::default(), ContentType::Guide);
        assert_eq!(QaStatus::default(), QaStatus::Pending);
    }

    #[test]
    fn word_count_target_does_not_overflow() {
        let mut entry = TopicMapEntry::new("x");
        entry.word_count_min = 3_000_000_000;
        entry.word_count_max = 3_000_000_000;
        assert_eq!(entry.word_count_target(), 3_000_000_000);
        entry.word_count_max = u32::MAX;
        assert_eq!(entry.word_count_target(), 3_647_483_647);
    }

    #[test]
    fn content_type_has_eight_values() {
        assert_eq!(ContentType::ALL.len(), 8);
        assert_eq!(ContentType::Faq.to_string(), "FAQ");
        assert_eq!(ContentType::CaseStudy.to_string(), "case-study");
    }

    #[test]
    fn new_entry_uses_defaults() {
        let entry = TopicMapEntry::new("Burr grinders");
        assert_eq!(entry.primary_keyword, "Burr grinders");
        assert_eq!(entry.search_intent, SearchIntent::Informational);
        assert_eq!(entry.word_count_target(), 2000);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_word_counts() {
        let mut entry = TopicMapEntry::new("x");
        entry.word_count_min = 3000;
        assert!(entry.validate().unwrap_err().contains("exceeds"));
    }

    #[test]
    fn validate_rejects_priority_out_of_range() {
        let mut entry = TopicMapEntry::new("x");
        entry.priority_score = 11;
        assert!(entry.validate().is_err());
        entry.priority_score = 0;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn split_list_trims_and_drops_empty() {
        assert_eq!(split_list(" a | b||c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn qa_record_extracts_flagged_lines() {
        let report = "## QA Report\n- ✅ H1 present\n- ❌ Meta description too long\n- ⚠️ Only 2 internal links\nQA Status: FLAGGED";
        let mut article = Article::new("Burr grinders", "a.md", "one two three");
        assert_eq!(article.word_count, 3);
        article.record_qa(false, 3, report);
        assert_eq!(article.qa_status, QaStatus::Flagged);
        assert_eq!(article.flagged_items.len(), 2);
        assert!(article.flagged_items[0].starts_with("❌"));
    }
}
