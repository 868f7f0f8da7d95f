//! Tools the content crew can call.
//!
//! Each phase gets its own registry: research only searches, the topic map
//! agent searches and saves CSV, brief writers search and save markdown, and
//! the production crew checks drafts and saves articles.

pub mod banned_phrases;
pub mod csv_writer;
pub mod file_writer;
pub mod serper_search;

use std::path::Path;
use std::sync::Arc;

use contentcrew_config::SearchConfig;
use contentcrew_core::tool::{Tool, ToolRegistry};

pub use banned_phrases::BannedPhraseTool;
pub use csv_writer::CsvWriterTool;
pub use file_writer::FileWriterTool;
pub use serper_search::SerperSearchTool;

/// The full set of tools, shared across phases.
#[derive(Clone)]
pub struct Toolkit {
    pub search: Arc<dyn Tool>,
    pub file_writer: Arc<dyn Tool>,
    pub csv_writer: Arc<dyn Tool>,
    pub banned_phrases: Arc<dyn Tool>,
}

impl Toolkit {
    /// Real tools, with writes confined to `output_root`.
    pub fn new(search: &SearchConfig, output_root: &Path) -> Self {
        Self {
            search: Arc::new(SerperSearchTool::from_config(search)),
            file_writer: Arc::new(FileWriterTool::confined_to(output_root)),
            csv_writer: Arc::new(CsvWriterTool::confined_to(output_root)),
            banned_phrases: Arc::new(BannedPhraseTool),
        }
    }

    /// Replace the search tool (tests script it).
    pub fn with_search(mut self, search: Arc<dyn Tool>) -> Self {
        self.search = search;
        self
    }

    pub fn research_registry(&self) -> ToolRegistry {
        ToolRegistry::new().with(self.search.clone())
    }

    pub fn topic_map_registry(&self) -> ToolRegistry {
        ToolRegistry::new()
            .with(self.search.clone())
            .with(self.csv_writer.clone())
    }

    pub fn brief_registry(&self) -> ToolRegistry {
        ToolRegistry::new()
            .with(self.search.clone())
            .with(self.file_writer.clone())
    }

    pub fn writer_registry(&self) -> ToolRegistry {
        ToolRegistry::new()
            .with(self.search.clone())
            .with(self.file_writer.clone())
    }

    pub fn qa_registry(&self) -> ToolRegistry {
        ToolRegistry::new()
            .with(self.banned_phrases.clone())
            .with(self.file_writer.clone())
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("search", &self.search.name())
            .field("file_writer", &self.file_writer.name())
            .field("csv_writer", &self.csv_writer.name())
            .field("banned_phrases", &self.banned_phrases.name())
            .finish()
    }
}
