//! The remote file list: a flat array of entries with implicit directories

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// One entry of the remote file list.
///
/// Directories appear as their own entries; files under them carry the full
/// slash-separated path. `size` and `sha1_hash` are only present for files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Slash-separated path relative to the site root
    pub path: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,
    /// Last modification time as the API reports it (RFC 2822 text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Snapshot of a site's file list at a point in time.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<RemoteEntry>,
}

impl Listing {
    #[must_use]
    pub fn new(entries: Vec<RemoteEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File entries only.
    pub fn files(&self) -> impl Iterator<Item = &RemoteEntry> {
        self.entries.iter().filter(|entry| !entry.is_directory)
    }

    /// Directory entries only.
    pub fn directories(&self) -> impl Iterator<Item = &RemoteEntry> {
        self.entries.iter().filter(|entry| entry.is_directory)
    }

    /// All remote paths, in listing order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.path.as_str())
    }
}

/// True when `path` cannot escape a download root: relative, with only
/// normal components (no `..`, no leading `/`, no drive prefix).
#[must_use]
pub fn clean_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Join a relative path's components with forward slashes, the separator the
/// remote side uses regardless of the local platform.
#[must_use]
pub fn to_remote(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn entry(path: &str, is_directory: bool) -> RemoteEntry {
        RemoteEntry {
            path: path.to_string(),
            is_directory,
            size: None,
            sha1_hash: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_files_and_directories_split() {
        let listing = Listing::new(vec![
            entry("dir0", true),
            entry("dir0/file00.html", false),
            entry("index.html", false),
        ]);
        assert_eq!(listing.files().count(), 2);
        assert_eq!(listing.directories().count(), 1);
        assert_eq!(
            listing.paths().collect::<Vec<_>>(),
            vec!["dir0", "dir0/file00.html", "index.html"]
        );
    }

    #[test]
    fn test_clean_relative_accepts_nested_paths() {
        assert!(clean_relative("index.html"));
        assert!(clean_relative("dir0/file00.html"));
        assert!(clean_relative("a/b/c.css"));
    }

    #[test]
    fn test_clean_relative_rejects_escapes() {
        assert!(!clean_relative(""));
        assert!(!clean_relative("/etc/passwd"));
        assert!(!clean_relative("../outside.html"));
        assert!(!clean_relative("dir/../../outside.html"));
        assert!(!clean_relative("./index.html"));
    }

    #[test]
    fn test_to_remote_uses_forward_slashes() {
        let path: PathBuf = ["dir0", "sub", "file.html"].iter().collect();
        assert_eq!(to_remote(&path), "dir0/sub/file.html");
    }

    #[test]
    fn test_to_remote_single_component() {
        assert_eq!(to_remote(Path::new("index.html")), "index.html");
    }

    #[test]
    fn test_entry_deserializes_without_optional_fields() {
        let entry: RemoteEntry =
            serde_json::from_str(r#"{"path": "dir0", "is_directory": true}"#).unwrap();
        assert!(entry.is_directory);
        assert_eq!(entry.size, None);
        assert_eq!(entry.sha1_hash, None);
    }
}
