//! File writer tool: saves briefs and articles produced by the model.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use contentcrew_core::content::word_count;
use contentcrew_core::error::ToolError;
use contentcrew_core::schema::Schema;
use contentcrew_core::tool::{Tool, ToolResult, require_str};

pub struct FileWriterTool {
    /// Writes must land under this directory. `None` = anywhere.
    root: Option<PathBuf>,
}

impl FileWriterTool {
    /// A writer with no path restriction.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// A writer confined to `root`.
    pub fn confined_to(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Default for FileWriterTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject `..` components and paths outside `root`.
pub(crate) fn check_path(tool_name: &str, path: &Path, root: Option<&Path>) -> Result<(), ToolError> {
    let denied = |reason: String| ToolError::PermissionDenied {
        tool_name: tool_name.to_string(),
        reason,
    };

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(denied(format!("path '{}' contains '..'", path.display())));
    }

    if let Some(root) = root {
        let abs = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                std::env::current_dir().unwrap_or_default().join(p)
            }
        };
        if !abs(path).starts_with(abs(root)) {
            return Err(denied(format!(
                "path '{}' is outside the output directory '{}'",
                path.display(),
                root.display()
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl Tool for FileWriterTool {
    fn name(&self) -> &str {
        "file_writer"
    }

    fn description(&self) -> &str {
        "Write markdown content to a file. Creates parent directories and overwrites any existing file."
    }

    fn parameters(&self) -> Schema {
        Schema::object()
            .property("content", Schema::string("The full content to write"))
            .property("output_path", Schema::string("File path where the content should be saved"))
            .require("content")
            .require("output_path")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let content = require_str(&arguments, "content")?;
        let output_path = require_str(&arguments, "output_path")?;
        let path = Path::new(output_path);

        check_path(self.name(), path, self.root.as_deref())?;

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failed(format!("ERROR writing file: {e}")));
        }

        match tokio::fs::write(path, content).await {
            Ok(()) => {
                let words = word_count(content);
                tracing::debug!(path = %output_path, words, "File written");
                Ok(ToolResult::ok(format!(
                    "SUCCESS: File written to {output_path} ({words} words)."
                )))
            }
            Err(e) => Ok(ToolResult::failed(format!("ERROR writing file: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration() {
        let tool = FileWriterTool::new();
        let decl = tool.declaration();
        assert_eq!(decl.name, "file_writer");
        assert_eq!(
            decl.parameters.required,
            Some(vec!["content".to_string(), "output_path".to_string()])
        );
    }

    #[tokio::test]
    async fn write_reports_word_count() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("briefs").join("Espresso - 2026-01-01.md");

        let tool = FileWriterTool::confined_to(dir.path());
        let result = tool
            .execute(serde_json::json!({
                "content": "# Brief\n\nFive words in total here",
                "output_path": file_path.to_str().unwrap()
            }))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(
            result.output,
            format!("SUCCESS: File written to {} (7 words).", file_path.display())
        );
        let content = std::fs::read_to_string(&file_path).unwrap();
        assert!(content.starts_with("# Brief"));
    }

    #[tokio::test]
    async fn overwrite_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("article.md");
        std::fs::write(&file_path, "old content").unwrap();

        let result = FileWriterTool::new()
            .execute(serde_json::json!({
                "content": "new content",
                "output_path": file_path.to_str().unwrap()
            }))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "new content");
    }

    #[tokio::test]
    async fn write_failure_is_reported_as_text() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should go
        let target = dir.path().join("taken");
        std::fs::create_dir(&target).unwrap();

        let result = FileWriterTool::new()
            .execute(serde_json::json!({
                "content": "x",
                "output_path": target.to_str().unwrap()
            }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("ERROR writing file:"));
    }

    #[tokio::test]
    async fn parent_traversal_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileWriterTool::confined_to(dir.path());
        let escape = format!("{}/../escape.md", dir.path().display());
        let err = tool
            .execute(serde_json::json!({"content": "x", "output_path": escape}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn outside_root_blocked() {
        let root = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let tool = FileWriterTool::confined_to(root.path());
        let err = tool
            .execute(serde_json::json!({
                "content": "x",
                "output_path": other.path().join("a.md").to_str().unwrap()
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("outside the output directory"));
    }

    #[tokio::test]
    async fn missing_arguments() {
        let tool = FileWriterTool::new();
        assert!(tool.execute(serde_json::json!({"content": "x"})).await.is_err());
        assert!(tool.execute(serde_json::json!({"output_path": "/tmp/x.md"})).await.is_err());
    }
}
