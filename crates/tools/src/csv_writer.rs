//! CSV writer tool: saves the topic map and checks its header.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contentcrew_core::error::ToolError;
use contentcrew_core::schema::Schema;
use contentcrew_core::tool::{Tool, ToolResult, require_str};
use contentcrew_core::topic_map::{TOPIC_MAP_COLUMNS, missing_columns, read_records};

use crate::file_writer::check_path;

pub struct CsvWriterTool {
    root: Option<PathBuf>,
}

impl CsvWriterTool {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn confined_to(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Default for CsvWriterTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Header check and row count of freshly written table text.
fn inspect(output_path: &str, csv: &str) -> Result<String, String> {
    let records = read_records(csv).map_err(|e| e.to_string())?;
    let mut records = records.into_iter();
    let header = records.next().unwrap_or_default();

    let missing = missing_columns(&header);
    if !missing.is_empty() {
        return Ok(format!(
            "WARNING: CSV written to {output_path} but missing expected columns: {}. Expected columns: {}",
            missing.join(", "),
            TOPIC_MAP_COLUMNS.join(", ")
        ));
    }
    Ok(format!(
        "SUCCESS: CSV written to {output_path} with {} topic rows.",
        records.count()
    ))
}

#[async_trait]
impl Tool for CsvWriterTool {
    fn name(&self) -> &str {
        "csv_writer"
    }

    fn description(&self) -> &str {
        "Write the topic map CSV to a file. The first line must be the header row. Reports missing columns and the number of topic rows written."
    }

    fn parameters(&self) -> Schema {
        Schema::object()
            .property(
                "csv_content",
                Schema::string("The full CSV content. First line is the header row."),
            )
            .property("output_path", Schema::string("File path where the CSV should be saved"))
            .require("csv_content")
            .require("output_path")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let csv = require_str(&arguments, "csv_content")?;
        let output_path = require_str(&arguments, "output_path")?;
        let path = Path::new(output_path);

        check_path(self.name(), path, self.root.as_deref())?;

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failed(format!("ERROR writing CSV: {e}")));
        }
        if let Err(e) = tokio::fs::write(path, csv).await {
            return Ok(ToolResult::failed(format!("ERROR writing CSV: {e}")));
        }

        match inspect(output_path, csv) {
            Ok(report) if report.starts_with("SUCCESS") => {
                tracing::debug!(path = %output_path, "Topic map written");
                Ok(ToolResult::ok(report))
            }
            Ok(warning) => Ok(ToolResult::failed(warning)),
            Err(e) => Ok(ToolResult::failed(format!("ERROR writing CSV: {e}"))),
        }
    }
}
