//! Source document discovery.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

/// A file read from the docs directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    /// Path relative to the docs directory, with `/` separators.
    pub path: String,
    pub content: String,
}

/// Whether `path` has one of `extensions` (case-insensitive, no leading dot).
/// An empty list accepts every file.
fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Every matching file below `root`, recursively, sorted by path.
///
/// Hidden files and directories are skipped.
pub async fn discover(root: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if has_extension(&path, extensions) {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(root = %root.display(), files = found.len(), "Discovered documents");
    Ok(found)
}

/// Read every matching document below `root`.
///
/// Files that are not valid UTF-8 are skipped with a warning.
pub async fn read_all(root: &Path, extensions: &[String]) -> std::io::Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();

    for path in discover(root, extensions).await? {
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %path.display(), "Skipping non UTF-8 document");
                continue;
            }
            Err(e) => return Err(e),
        };
        documents.push(SourceDocument { path: relative_path(root, &path), content });
    }

    Ok(documents)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md() -> Vec<String> {
        vec!["md".into(), "mdx".into()]
    }

    #[tokio::test]
    async fn walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("guide/advanced")).unwrap();
        std::fs::write(dir.path().join("intro.md"), "# Intro").unwrap();
        std::fs::write(dir.path().join("guide/setup.MDX"), "# Setup").unwrap();
        std::fs::write(dir.path().join("guide/advanced/tuning.md"), "# Tuning").unwrap();
        std::fs::write(dir.path().join("guide/logo.png"), [0u8, 1, 2]).unwrap();

        let docs = read_all(dir.path(), &md()).await.unwrap();
        let paths: Vec<&str> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["guide/advanced/tuning.md", "guide/setup.MDX", "intro.md"]);
        assert_eq!(docs[2].content, "# Intro");
    }

    #[tokio::test]
    async fn hidden_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/notes.md"), "x").unwrap();
        std::fs::write(dir.path().join(".draft.md"), "x").unwrap();

        assert!(discover(dir.path(), &md()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let err = discover(Path::new("/nonexistent/docs"), &md()).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn empty_extension_list_accepts_everything() {
        assert!(has_extension(Path::new("a.txt"), &[]));
        assert!(!has_extension(Path::new("a.txt"), &md()));
        assert!(!has_extension(Path::new("Makefile"), &md()));
    }
}
