//! File tools: read, write and edit files inside the workspace.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use taskloom_core::ToolError;
use taskloom_security::resolve_in_workspace;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub append: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditFileArgs {
    pub path: String,
    pub old_text: String,
    pub new_text: String,
}

/// File handlers rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct FileTools {
    workdir: PathBuf,
    read_limit: usize,
}

impl FileTools {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            read_limit: 50_000,
        }
    }

    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = limit;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        resolve_in_workspace(&self.workdir, path)
            .map_err(|e| ToolError::SandboxViolation(e.to_string()))
    }

    /// Return the file's text, optionally only the first `limit` lines.
    pub async fn read(&self, args: ReadFileArgs) -> Result<String, ToolError> {
        let full = self.resolve(&args.path)?;
        let text = tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| io_failure("read_file", &args.path, e))?;

        let body = match args.limit {
            Some(limit) if limit > 0 => text.lines().take(limit).collect::<Vec<_>>().join("\n"),
            _ => text.lines().collect::<Vec<_>>().join("\n"),
        };
        Ok(body.chars().take(self.read_limit).collect())
    }

    /// Write or append, creating parent directories as needed.
    pub async fn write(&self, args: WriteFileArgs) -> Result<String, ToolError> {
        let full = self.resolve(&args.path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failure("write_file", &args.path, e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(args.append)
            .truncate(!args.append)
            .open(&full)
            .await
            .map_err(|e| io_failure("write_file", &args.path, e))?;
        file.write_all(args.content.as_bytes())
            .await
            .map_err(|e| io_failure("write_file", &args.path, e))?;
        file.flush()
            .await
            .map_err(|e| io_failure("write_file", &args.path, e))?;

        let verb = if args.append { "Appended to" } else { "Wrote" };
        Ok(format!("{verb} {} ({} bytes)", args.path, args.content.len()))
    }

    /// Replace the first occurrence of `old_text`.
    pub async fn edit(&self, args: EditFileArgs) -> Result<String, ToolError> {
        let full = self.resolve(&args.path)?;
        let text = tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| io_failure("edit_file", &args.path, e))?;

        if !text.contains(&args.old_text) {
            return Err(ToolError::Failed(format!("Text not found in {}", args.path)));
        }

        tokio::fs::write(&full, text.replacen(&args.old_text, &args.new_text, 1))
            .await
            .map_err(|e| io_failure("edit_file", &args.path, e))?;
        Ok(format!("Edited {}", args.path))
    }
}

fn io_failure(tool: &str, path: &str, e: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.into(),
        reason: format!("{path}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_args(path: &str, content: &str, append: bool) -> WriteFileArgs {
        WriteFileArgs {
            path: path.into(),
            content: content.into(),
            append,
        }
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());

        let reply = tools.write(write_args("a/b/c.txt", "one\ntwo\nthree", false)).await.unwrap();
        assert_eq!(reply, "Wrote a/b/c.txt (13 bytes)");

        let text = tools
            .read(ReadFileArgs { path: "a/b/c.txt".into(), limit: None })
            .await
            .unwrap();
        assert_eq!(text, "one\ntwo\nthree");

        let first = tools
            .read(ReadFileArgs { path: "a/b/c.txt".into(), limit: Some(2) })
            .await
            .unwrap();
        assert_eq!(first, "one\ntwo");
    }

    #[tokio::test]
    async fn append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());
        tools.write(write_args("log.txt", "a", false)).await.unwrap();
        let reply = tools.write(write_args("log.txt", "b", true)).await.unwrap();
        assert_eq!(reply, "Appended to log.txt (1 bytes)");
        assert_eq!(std::fs::read_to_string(dir.path().join("log.txt")).unwrap(), "ab");
    }

    #[tokio::test]
    async fn overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());
        tools.write(write_args("f.txt", "long content", false)).await.unwrap();
        tools.write(write_args("f.txt", "short", false)).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "short");
    }

    #[tokio::test]
    async fn edit_replaces_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.rs"), "foo foo").unwrap();
        let tools = FileTools::new(dir.path());

        let reply = tools
            .edit(EditFileArgs {
                path: "x.rs".into(),
                old_text: "foo".into(),
                new_text: "bar".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "Edited x.rs");
        assert_eq!(std::fs::read_to_string(dir.path().join("x.rs")).unwrap(), "bar foo");
    }

    #[tokio::test]
    async fn edit_missing_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.rs"), "foo").unwrap();
        let err = FileTools::new(dir.path())
            .edit(EditFileArgs {
                path: "x.rs".into(),
                old_text: "nope".into(),
                new_text: "bar".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Text not found in x.rs");
    }

    #[tokio::test]
    async fn escaping_paths_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tools = FileTools::new(dir.path());
        let err = tools.write(write_args("../evil.txt", "x", false)).await.unwrap_err();
        assert_eq!(err.to_string(), "Path escapes workspace: ../evil.txt");

        let err = tools
            .read(ReadFileArgs { path: "/etc/hostname".into(), limit: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation(_)));
    }

    #[tokio::test]
    async fn read_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(100)).unwrap();
        let text = FileTools::new(dir.path())
            .with_read_limit(10)
            .read(ReadFileArgs { path: "big.txt".into(), limit: None })
            .await
            .unwrap();
        assert_eq!(text.len(), 10);
    }

    #[tokio::test]
    async fn missing_file_is_an_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileTools::new(dir.path())
            .read(ReadFileArgs { path: "nope.txt".into(), limit: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
