//! Pipeline state owned by one run.

use std::path::{Path, PathBuf};

use contentcrew_core::content::{Article, ClientContext, ContentBrief, QaStatus, TopicMapEntry};
use contentcrew_core::error::Error;
use contentcrew_core::layout::OutputLayout;
use contentcrew_core::topic_map::parse_topic_map;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    pub client: ClientContext,
    pub seed_topic: String,
    pub topic_entries: Vec<TopicMapEntry>,
    pub briefs: Vec<ContentBrief>,
    pub articles: Vec<Article>,
    pub topic_map_path: Option<PathBuf>,
    pub topic_map_summary: String,
    pub brief_index_path: Option<PathBuf>,
    pub production_index_path: Option<PathBuf>,
    /// 0 before research starts, then 1..=3.
    pub current_phase: u8,
    pub layout: OutputLayout,
}

/// Totals reported when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductionSummary {
    pub total: usize,
    pub passed: usize,
    pub flagged: usize,
}

impl PipelineState {
    pub fn new(client: ClientContext, seed_topic: impl Into<String>, layout: OutputLayout) -> Self {
        Self {
            client,
            seed_topic: seed_topic.into(),
            topic_entries: Vec::new(),
            briefs: Vec::new(),
            articles: Vec::new(),
            topic_map_path: None,
            topic_map_summary: String::new(),
            brief_index_path: None,
            production_index_path: None,
            current_phase: 0,
            layout,
        }
    }

    /// Topics by descending priority, ties in map order.
    pub fn topics_by_priority(&self) -> Vec<&TopicMapEntry> {
        by_priority(&self.topic_entries, |t| t.priority_score)
    }

    /// Briefs by descending priority, ties in creation order.
    pub fn briefs_by_priority(&self) -> Vec<&ContentBrief> {
        by_priority(&self.briefs, |b| b.priority_score)
    }

    pub fn topic_entry(&self, topic_name: &str) -> Option<&TopicMapEntry> {
        self.topic_entries.iter().find(|t| t.topic_name == topic_name)
    }

    /// Swap in a freshly loaded topic map. On failure the current entries
    /// are left untouched.
    pub fn apply_topic_map(&mut self, loaded: Result<Vec<TopicMapEntry>, Error>) -> Result<usize, Error> {
        self.topic_entries = loaded?;
        Ok(self.topic_entries.len())
    }

    pub fn summary(&self) -> ProductionSummary {
        ProductionSummary {
            total: self.articles.len(),
            passed: self.count_status(QaStatus::Passed),
            flagged: self.count_status(QaStatus::Flagged),
        }
    }

    pub fn flagged_articles(&self) -> impl Iterator<Item = &Article> {
        self.articles
            .iter()
            .filter(|a| a.qa_status == QaStatus::Flagged)
    }

    fn count_status(&self, status: QaStatus) -> usize {
        self.articles.iter().filter(|a| a.qa_status == status).count()
    }
}

/// Read and parse a topic map file.
pub async fn load_topic_map(path: &Path) -> Result<Vec<TopicMapEntry>, Error> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_topic_map(&text)?)
}

/// Stable sort by descending key.
pub fn by_priority<T>(items: &[T], key: impl Fn(&T) -> u8) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by_key(|item| std::cmp::Reverse(key(item)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentcrew_core::topic_map::render_topic_map;

    fn entry(name: &str, priority: u8) -> TopicMapEntry {
        let mut e = TopicMapEntry::new(name);
        e.priority_score = priority;
        e
    }

    fn state(dir: &std::path::Path) -> PipelineState {
        PipelineState::new(
            ClientContext::default(),
            "espresso",
            OutputLayout::new(dir),
        )
    }

    #[test]
    fn priority_order_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = state(dir.path());
        s.topic_entries = vec![entry("a", 3), entry("b", 9), entry("c", 5), entry("d", 9)];

        let names: Vec<_> = s.topics_by_priority().iter().map(|t| t.topic_name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "c", "a"]);
    }

    #[tokio::test]
    async fn reload_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        std::fs::write(&path, render_topic_map(&[entry("a", 3)])).unwrap();

        let mut s = state(dir.path());
        assert_eq!(s.apply_topic_map(load_topic_map(&path).await).unwrap(), 1);

        std::fs::write(&path, render_topic_map(&[entry("a", 3), entry("b", 8)])).unwrap();
        assert_eq!(s.apply_topic_map(load_topic_map(&path).await).unwrap(), 2);
        assert_eq!(s.topic_entries[1].topic_name, "b");
    }

    #[tokio::test]
    async fn failed_reload_keeps_prior_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        std::fs::write(&path, render_topic_map(&[entry("a", 3)])).unwrap();

        let mut s = state(dir.path());
        s.apply_topic_map(load_topic_map(&path).await).unwrap();

        let broken = render_topic_map(&[entry("a", 3)]).replace(",3,", ",lots,");
        std::fs::write(&path, broken).unwrap();
        let err = s.apply_topic_map(load_topic_map(&path).await).unwrap_err();
        assert!(matches!(err, Error::TopicMap(_)));
        assert_eq!(s.topic_entries.len(), 1);

        std::fs::remove_file(&path).unwrap();
        let err = s.apply_topic_map(load_topic_map(&path).await).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(s.topic_entries.len(), 1);
    }

    #[test]
    fn summary_counts_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = state(dir.path());
        let mut a = Article::new("a", "a.md", "text");
        a.record_qa(true, 1, "");
        let mut b = Article::new("b", "b.md", "text");
        b.record_qa(false, 3, "- Word count ❌");
        s.articles = vec![a, b, Article::new("c", "c.md", "")];

        assert_eq!(
            s.summary(),
            ProductionSummary {
                total: 3,
                passed: 1,
                flagged: 1
            }
        );
        assert_eq!(s.flagged_articles().count(), 1);
    }
}
