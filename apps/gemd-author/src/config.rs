//! # Author Configuration
//!
//! Optional `gemd.toml` read at startup:
//!
//! ```toml
//! [store]
//! id = "lab"
//! root = "templates"
//!
//! [log]
//! format = "json"
//! ```
//!
//! Every key is optional. CLI flags win over the file.

use gemd_core::GemdError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "gemd.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Store id, also the persistent-id namespace.
    pub id: String,
    /// Directory holding the kind folders and `registry.json`.
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `text` or `json`.
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            root: PathBuf::from("templates"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

impl AuthorConfig {
    /// Load the configuration.
    ///
    /// With an explicit path the file must exist. Without one, a missing
    /// `gemd.toml` yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, GemdError> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(path)
            .map_err(|e| GemdError::store_io(path, format!("cannot read config: {}", e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, GemdError> {
        toml::from_str(text)
            .map_err(|e| GemdError::SerializationError(format!("invalid config: {}", e)))
    }

    /// Apply CLI overrides on top of the file values.
    #[must_use]
    pub fn with_overrides(mut self, store_id: Option<String>, root: Option<PathBuf>) -> Self {
        if let Some(id) = store_id {
            self.store.id = id;
        }
        if let Some(root) = root {
            self.store.root = root;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AuthorConfig::parse("").expect("parse");
        assert_eq!(config, AuthorConfig::default());
        assert_eq!(config.store.id, "default");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AuthorConfig::parse("[store]\nid = \"lab\"\n").expect("parse");
        assert_eq!(config.store.id, "lab");
        assert_eq!(config.store.root, PathBuf::from("templates"));
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = AuthorConfig::parse("[store]\nbucket = \"x\"\n");
        assert!(matches!(result, Err(GemdError::SerializationError(_))));
    }

    #[test]
    fn explicit_file_loaded_and_overridden() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("author.toml");
        std::fs::write(
            &path,
            "[store]\nid = \"lab\"\nroot = \"lab-templates\"\n\n[log]\nformat = \"json\"\n",
        )
        .expect("write");

        let config = AuthorConfig::load(Some(&path)).expect("load");
        assert_eq!(config.log.format, "json");
        assert_eq!(config.store.root, PathBuf::from("lab-templates"));

        let config = config.with_overrides(Some("other".to_string()), None);
        assert_eq!(config.store.id, "other");
        assert_eq!(config.store.root, PathBuf::from("lab-templates"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let result = AuthorConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(GemdError::StoreIo { .. })));
    }
}
