//! Filesystem tools for Golem
//!
//! `read_file`, `write_file` and `list_dir`. Every path goes through
//! [`validate_path`] against the context's workspace before the disk is
//! touched, so relative paths resolve under the workspace and escapes are
//! rejected with an `access denied` error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{GolemError, Result};
use crate::security::validate_path;

use super::{Tool, ToolContext};

fn resolve_path(args: &Value, ctx: &ToolContext) -> Result<PathBuf> {
    let path = required_str(args, "path")?;
    validate_path(ctx.workspace_root(), path)
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GolemError::Tool(format!("Missing '{}' argument", key)))
}

fn optional_usize(args: &Value, key: &str) -> usize {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(0)
}

/// Output of [`read_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWindow {
    /// Selected lines joined with `\n`
    pub content: String,
    /// Number of lines in the whole file
    pub total_lines: usize,
}

/// Reads a window of lines from `path`, streaming so skipped lines are never
/// held in memory.
///
/// Lines are what splitting on `\n` would produce: an empty file is one empty
/// line, and a trailing newline ends with one more empty line. `offset` is
/// zero-based; a `limit` of zero means "to the end".
pub async fn read_lines(path: &Path, offset: usize, limit: usize) -> std::io::Result<LineWindow> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut index = 0usize;

    let wanted = |i: usize| i >= offset && (limit == 0 || i - offset < limit);

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).await?;
        let ended_with_newline = buf.last() == Some(&b'\n');
        if wanted(index) {
            if ended_with_newline {
                buf.pop();
            }
            lines.push(String::from_utf8_lossy(&buf).into_owned());
        }
        index += 1;

        // A read without a trailing newline (including the empty read at
        // EOF) was the final line.
        if read == 0 || !ended_with_newline {
            break;
        }
    }

    Ok(LineWindow {
        content: lines.join("\n"),
        total_lines: index,
    })
}

/// Reads a file, optionally a window of its lines.
///
/// Returns `{"content": ..., "total_lines": ...}`.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Use offset and limit to read a range of lines."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace or absolute"
                },
                "offset": {
                    "type": "integer",
                    "description": "Starting line number (0-based)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to read (0 reads to the end)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let full_path = resolve_path(&args, ctx)?;
        let offset = optional_usize(&args, "offset");
        let limit = optional_usize(&args, "limit");

        let window = read_lines(&full_path, offset, limit).await.map_err(|e| {
            GolemError::Tool(format!(
                "Failed to read file '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        Ok(json!({
            "content": window.content,
            "total_lines": window.total_lines,
        })
        .to_string())
    }
}

/// Writes a file, creating parent directories as needed.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and missing parent directories) if necessary"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace or absolute"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let content = required_str(&args, "content")?;
        let full_path = resolve_path(&args, ctx)?;

        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GolemError::Tool(format!("Failed to create parent directories: {}", e))
                })?;
            }
        }

        tokio::fs::write(&full_path, content).await.map_err(|e| {
            GolemError::Tool(format!(
                "Failed to write file '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        Ok("File written successfully".to_string())
    }
}

/// Lists a directory as a JSON array of names, directories suffixed `/`.
pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory path, relative to the workspace or absolute"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let full_path = resolve_path(&args, ctx)?;

        let mut entries = tokio::fs::read_dir(&full_path).await.map_err(|e| {
            GolemError::Tool(format!(
                "Failed to read directory '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GolemError::Tool(format!("Failed to read directory entry: {}", e)))?
        {
            let mut name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await.map(|ft| ft.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            items.push(name);
        }

        items.sort();
        Ok(serde_json::to_string(&items)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new().with_workspace(dir.path().to_str().unwrap())
    }

    async fn read(dir: &TempDir, args: Value) -> Value {
        let out = ReadFileTool.execute(args, &workspace_ctx(dir)).await.unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn test_read_file_window() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "line1\nline2\nline3\nline4").unwrap();

        let out = read(&dir, json!({"path": "f.txt", "offset": 1, "limit": 2})).await;
        assert_eq!(out["content"], "line2\nline3");
        assert_eq!(out["total_lines"], 4);
    }

    #[tokio::test]
    async fn test_read_file_whole() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "a\nb").unwrap();

        let out = read(&dir, json!({"path": "f.txt"})).await;
        assert_eq!(out["content"], "a\nb");
        assert_eq!(out["total_lines"], 2);
    }

    #[tokio::test]
    async fn test_read_file_trailing_newline_counts_empty_line() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "a\nb\n").unwrap();

        let out = read(&dir, json!({"path": "f.txt"})).await;
        assert_eq!(out["content"], "a\nb\n");
        assert_eq!(out["total_lines"], 3);
    }

    #[tokio::test]
    async fn test_read_empty_file_has_one_line() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("empty.txt"), "").unwrap();

        let out = read(&dir, json!({"path": "empty.txt"})).await;
        assert_eq!(out["content"], "");
        assert_eq!(out["total_lines"], 1);
    }

    #[tokio::test]
    async fn test_read_offset_past_end() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "x\ny").unwrap();

        let out = read(&dir, json!({"path": "f.txt", "offset": 10})).await;
        assert_eq!(out["content"], "");
        assert_eq!(out["total_lines"], 2);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ReadFileTool
            .execute(json!({"path": "nope.txt"}), &workspace_ctx(&dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[tokio::test]
    async fn test_missing_path_argument() {
        let err = ReadFileTool.execute(json!({}), &ToolContext::new()).await.unwrap_err();
        assert!(err.to_string().contains("Missing 'path' argument"));
    }

    #[tokio::test]
    async fn test_write_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let result = WriteFileTool
            .execute(
                json!({"path": "deep/nested/out.txt", "content": "hello"}),
                &workspace_ctx(&dir),
            )
            .await
            .unwrap();

        assert_eq!(result, "File written successfully");
        let written = std::fs::read_to_string(dir.path().join("deep/nested/out.txt")).unwrap();
        assert_eq!(written, "hello");
    }

    #[tokio::test]
    async fn test_write_without_workspace_uses_path_as_is() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("plain.txt");

        WriteFileTool
            .execute(
                json!({"path": target.to_str().unwrap(), "content": "free"}),
                &ToolContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "free");
    }

    #[tokio::test]
    async fn test_list_dir_sorted_with_dir_suffix() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let out = ListDirTool
            .execute(json!({"path": "."}), &workspace_ctx(&dir))
            .await
            .unwrap();
        let names: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub/"]);
    }

    #[tokio::test]
    async fn test_list_empty_dir_is_empty_array() {
        let dir = TempDir::new().unwrap();
        let out = ListDirTool
            .execute(json!({"path": "."}), &workspace_ctx(&dir))
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[tokio::test]
    async fn test_all_tools_reject_escape() {
        let dir = TempDir::new().unwrap();
        let ctx = workspace_ctx(&dir);

        let read = ReadFileTool.execute(json!({"path": "../secret"}), &ctx).await;
        let write = WriteFileTool
            .execute(json!({"path": "../evil.txt", "content": "x"}), &ctx)
            .await;
        let list = ListDirTool.execute(json!({"path": "/etc"}), &ctx).await;

        for result in [read, write, list] {
            let err = result.unwrap_err();
            assert!(err.to_string().contains("access denied"), "got: {}", err);
        }
        assert!(!dir.path().parent().unwrap().join("evil.txt").exists());
    }
}
