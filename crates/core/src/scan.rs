//! Local directory walking via the `ignore` crate

use std::path::PathBuf;

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use tracing::warn;

use crate::error::{Error, Result};

/// Walker for the local directory tree that will become site content.
///
/// A site tree is not a source tree, so gitignore files are not consulted;
/// dotfiles are skipped (the remote side would reject most of them anyway),
/// and exclude patterns from config or the caller are applied on top.
pub struct Scanner {
    root: PathBuf,
    /// Glob patterns whose matches are never yielded
    excludes: Vec<String>,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
        }
    }

    /// Add an exclude pattern (gitignore glob syntax)
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Build an override matcher for the exclude patterns
    fn exclude_matcher(&self) -> Result<Option<Override>> {
        if self.excludes.is_empty() {
            return Ok(None);
        }

        let mut overrides = OverrideBuilder::new(&self.root);
        for pattern in &self.excludes {
            // A leading "!" makes an override pattern an exclusion.
            overrides
                .add(&format!("!{pattern}"))
                .map_err(|err| bad_pattern(pattern, &err))?;
        }
        let matcher = overrides
            .build()
            .map_err(|err| Error::Argument(format!("invalid exclude patterns: {err}")))?;
        Ok(Some(matcher))
    }

    /// Walk the tree and return the relative paths of all files beneath the
    /// root, sorted for determinism. Directories are never yielded. Entries
    /// the filesystem refuses to read are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if an exclude pattern does not parse.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != ".git");
        if let Some(matcher) = self.exclude_matcher()? {
            builder.overrides(matcher);
        }

        let mut paths = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // Entries always live under the root we handed to the walker.
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            paths.push(relative.to_path_buf());
        }

        paths.sort();
        Ok(paths)
    }
}

fn bad_pattern(pattern: &str, err: &ignore::Error) -> Error {
    Error::Argument(format!("invalid exclude pattern {pattern:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Component, Path};

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_scan_simple_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html>").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();

        let paths = Scanner::new(dir.path()).scan().unwrap();

        assert_eq!(
            paths,
            vec![Path::new("index.html"), Path::new("style.css")]
        );
    }

    #[test]
    fn test_scan_nested_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        fs::write(dir.path().join("root.html"), "r").unwrap();
        fs::write(dir.path().join("sub/nested.html"), "n").unwrap();
        fs::write(dir.path().join("sub/deep/leaf.html"), "l").unwrap();

        let paths = Scanner::new(dir.path()).scan().unwrap();

        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"sub/deep/leaf.html".into()));
    }

    #[test]
    fn test_scan_yields_only_clean_relative_paths() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.html"), "c").unwrap();

        let paths = Scanner::new(dir.path()).scan().unwrap();

        for path in &paths {
            assert!(path.is_relative(), "{path:?}");
            assert!(
                path.components()
                    .all(|component| matches!(component, Component::Normal(_))),
                "{path:?}"
            );
        }
    }

    #[test]
    fn test_scan_output_is_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["zebra.html", "apple.html", "mango.html"] {
            fs::write(dir.path().join(name), name).unwrap();
        }

        let paths = Scanner::new(dir.path()).scan().unwrap();
        let mut sorted = paths.clone();
        sorted.sort();

        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_scan_skips_dotfiles() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".secret"), "x").unwrap();
        fs::write(dir.path().join("index.html"), "<html>").unwrap();

        let paths = Scanner::new(dir.path()).scan().unwrap();

        assert_eq!(paths, vec![Path::new("index.html").to_path_buf()]);
    }

    #[test]
    fn test_exclude_pattern_drops_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("keep.html"), "k").unwrap();
        fs::write(dir.path().join("draft.psd"), "d").unwrap();

        let paths = Scanner::new(dir.path()).exclude("*.psd").scan().unwrap();

        assert_eq!(paths, vec![Path::new("keep.html").to_path_buf()]);
    }

    #[test]
    fn test_exclude_pattern_prunes_subtree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("drafts")).unwrap();
        fs::write(dir.path().join("drafts/wip.html"), "w").unwrap();
        fs::write(dir.path().join("index.html"), "<html>").unwrap();

        let paths = Scanner::new(dir.path()).exclude("drafts/").scan().unwrap();

        assert_eq!(paths, vec![Path::new("index.html").to_path_buf()]);
    }

    #[test]
    fn test_bad_exclude_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Scanner::new(dir.path()).exclude("a{").scan().unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }
}
