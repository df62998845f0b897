//! Upload-root configuration file parsing (.neocli.toml)

use std::path::Path;

use crate::error::{Error, Result};

/// Per-site configuration loaded from the root of the directory being
/// uploaded. The file itself starts with a dot, so the walker never picks
/// it up as site content.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Glob patterns that are never uploaded (e.g. `drafts/`, `*.psd`)
    pub exclude: Vec<String>,
}

/// Config file name
pub const CONFIG_FILE: &str = ".neocli.toml";

impl SiteConfig {
    /// Load config from the upload root.
    ///
    /// Returns the default config if `.neocli.toml` doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path).map_err(|source| Error::Filesystem {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str(&content)
            .map_err(|err| Error::Argument(format!("invalid {}: {err}", config_path.display())))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_config_with_excludes() {
        let toml = r#"
exclude = ["drafts/", "*.psd"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.exclude, vec!["drafts/", "*.psd"]);
    }

    #[test]
    fn test_parse_empty_config() {
        let config: SiteConfig = toml::from_str("").unwrap();
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path()).unwrap();
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "exclude = 3").unwrap();
        let err = SiteConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }
}
