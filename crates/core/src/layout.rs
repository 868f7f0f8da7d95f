//! Output directory layout for one run.
//!
//! ```text
//! <root>/
//!   topic_maps/<seed> - <date>.csv
//!   briefs/<topic> - <date>.md
//!   briefs/Brief Index - <date>.md
//!   articles/<topic> - <date>.md
//!   articles/Production Index - <date>.md
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TOPIC_MAPS_DIR: &str = "topic_maps";
pub const BRIEFS_DIR: &str = "briefs";
pub const ARTICLES_DIR: &str = "articles";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout for a run namespaced under `base`.
    pub fn for_run(base: impl AsRef<Path>, run_id: &str) -> Self {
        Self::new(base.as_ref().join(format!("run-{run_id}")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn topic_maps_dir(&self) -> PathBuf {
        self.root.join(TOPIC_MAPS_DIR)
    }

    pub fn briefs_dir(&self) -> PathBuf {
        self.root.join(BRIEFS_DIR)
    }

    pub fn articles_dir(&self) -> PathBuf {
        self.root.join(ARTICLES_DIR)
    }

    pub fn topic_map_path(&self, seed_topic: &str, date: NaiveDate) -> PathBuf {
        self.topic_maps_dir().join(dated_name(seed_topic, date, "csv"))
    }

    pub fn brief_path(&self, topic: &str, date: NaiveDate) -> PathBuf {
        self.briefs_dir().join(dated_name(topic, date, "md"))
    }

    pub fn article_path(&self, topic: &str, date: NaiveDate) -> PathBuf {
        self.articles_dir().join(dated_name(topic, date, "md"))
    }

    pub fn brief_index_path(&self, date: NaiveDate) -> PathBuf {
        self.briefs_dir().join(dated_name("Brief Index", date, "md"))
    }

    pub fn production_index_path(&self, date: NaiveDate) -> PathBuf {
        self.articles_dir().join(dated_name("Production Index", date, "md"))
    }

    /// Create the root and every phase directory.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.topic_maps_dir(), self.briefs_dir(), self.articles_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// `"<name> - <YYYY-MM-DD>.<ext>"`, with path separators in `name` replaced.
pub fn dated_name(name: &str, date: NaiveDate, ext: &str) -> String {
    let safe: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("{safe} - {}.{ext}", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn run_layout_is_namespaced() {
        let layout = OutputLayout::for_run("output", "ab12cd34");
        assert_eq!(layout.root(), Path::new("output/run-ab12cd34"));
        assert_eq!(
            layout.topic_map_path("espresso", day()),
            Path::new("output/run-ab12cd34/topic_maps/espresso - 2026-03-14.csv")
        );
        assert_eq!(
            layout.brief_index_path(day()),
            Path::new("output/run-ab12cd34/briefs/Brief Index - 2026-03-14.md")
        );
    }

    #[test]
    fn separators_in_topic_names_are_replaced() {
        assert_eq!(dated_name("AC/DC: live", day(), "md"), "AC-DC- live - 2026-03-14.md");
    }

    #[test]
    fn ensure_dirs_creates_phase_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(tmp.path().join("run-x"));
        layout.ensure_dirs().unwrap();
        assert!(layout.topic_maps_dir().is_dir());
        assert!(layout.briefs_dir().is_dir());
        assert!(layout.articles_dir().is_dir());
    }
}
