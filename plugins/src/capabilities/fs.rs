//! Filesystem capabilities backed by `tokio::fs`.
//!
//! Relative paths resolve against an optional root directory; absolute
//! paths are used as given.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use taskweave_core::executor::traits::Capability;
use taskweave_core::executor::types::{ArgMap, CapabilityError};
use tokio::io::AsyncWriteExt;

use super::parse_args;

fn resolve(root: Option<&Path>, path: &str) -> Result<PathBuf, CapabilityError> {
    if path.trim().is_empty() {
        return Err(CapabilityError::InvalidArgs("path must not be empty".into()));
    }
    let candidate = PathBuf::from(path);
    Ok(match root {
        Some(root) if candidate.is_relative() => root.join(candidate),
        _ => candidate,
    })
}

fn io_error(path: &Path, err: std::io::Error) -> CapabilityError {
    CapabilityError::Io(format!("{}: {}", path.display(), err))
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

pub struct ReadFileCapability {
    root: Option<PathBuf>,
}

impl ReadFileCapability {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Capability for ReadFileCapability {
    fn name(&self) -> &str {
        "read_file"
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        let parsed: PathArgs = parse_args(args)?;
        let path = resolve(self.root.as_deref(), &parsed.path)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "read_file");
        Ok(json!({
            "path": parsed.path,
            "bytes": content.len(),
            "content": content,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    append: bool,
}

pub struct WriteFileCapability {
    root: Option<PathBuf>,
}

impl WriteFileCapability {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Capability for WriteFileCapability {
    fn name(&self) -> &str {
        "write_file"
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        let parsed: WriteArgs = parse_args(args)?;
        let path = resolve(self.root.as_deref(), &parsed.path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(parsed.append)
            .truncate(!parsed.append)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        file.write_all(parsed.content.as_bytes())
            .await
            .map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))?;

        tracing::debug!(path = %path.display(), bytes = parsed.content.len(), append = parsed.append, "write_file");
        Ok(json!({
            "path": parsed.path,
            "bytes": parsed.content.len(),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "default_list_path")]
    path: String,
}

fn default_list_path() -> String {
    ".".to_string()
}

pub struct ListDirCapability {
    root: Option<PathBuf>,
}

impl ListDirCapability {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Capability for ListDirCapability {
    fn name(&self) -> &str {
        "list_dir"
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        let parsed: ListArgs = parse_args(args)?;
        let path = resolve(self.root.as_deref(), &parsed.path)?;

        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| io_error(&path, e))? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        entries.sort();

        let entries: Vec<Value> = entries
            .into_iter()
            .map(|(name, is_dir)| json!({ "name": name, "is_dir": is_dir }))
            .collect();
        Ok(json!({
            "path": parsed.path,
            "count": entries.len(),
            "entries": entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(value: Value) -> ArgMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_write_then_read_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = Some(dir.path().to_path_buf());
        let write = WriteFileCapability::new(root.clone());
        let read = ReadFileCapability::new(root);

        let written = write
            .invoke(&args(json!({"path": "notes/a.txt", "content": "hello"})))
            .await
            .unwrap();
        assert_eq!(written, json!({"path": "notes/a.txt", "bytes": 5}));
        assert!(dir.path().join("notes/a.txt").exists());

        write
            .invoke(&args(json!({"path": "notes/a.txt", "content": " world", "append": true})))
            .await
            .unwrap();

        let value = read
            .invoke(&args(json!({"path": "notes/a.txt"})))
            .await
            .unwrap();
        assert_eq!(value["content"], "hello world");
        assert_eq!(value["bytes"], 11);
    }

    #[tokio::test]
    async fn test_write_truncates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let write = WriteFileCapability::new(Some(dir.path().to_path_buf()));
        write
            .invoke(&args(json!({"path": "f.txt", "content": "long content"})))
            .await
            .unwrap();
        write
            .invoke(&args(json!({"path": "f.txt", "content": "short"})))
            .await
            .unwrap();
        let text = std::fs::read_to_string(dir.path().join("f.txt")).unwrap();
        assert_eq!(text, "short");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let read = ReadFileCapability::new(Some(dir.path().to_path_buf()));
        let err = read
            .invoke(&args(json!({"path": "missing.txt"})))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Io(_)));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_missing_or_empty_path_is_invalid() {
        let read = ReadFileCapability::new(None);
        assert!(matches!(
            read.invoke(&ArgMap::new()).await,
            Err(CapabilityError::InvalidArgs(_))
        ));
        assert!(matches!(
            read.invoke(&args(json!({"path": "  "}))).await,
            Err(CapabilityError::InvalidArgs(_))
        ));
    }

    #[tokio::test]
    async fn test_list_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let list = ListDirCapability::new(Some(dir.path().to_path_buf()));
        let value = list.invoke(&ArgMap::new()).await.unwrap();
        assert_eq!(value["count"], 3);
        assert_eq!(
            value["entries"],
            json!([
                {"name": "a.txt", "is_dir": false},
                {"name": "b.txt", "is_dir": false},
                {"name": "sub", "is_dir": true},
            ])
        );
    }
}
