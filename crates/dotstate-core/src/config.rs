//! Configuration: where the source and target trees live, and the data
//! templates are rendered against.

use std::path::{Path, PathBuf};

use dotstate_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::source::SourceTree;
use crate::{Error, Result};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "dotstate";

/// Runtime configuration.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// source_dir = "/home/alice/dotfiles"
///
/// [data]
/// email = "alice@example.com"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the source tree.
    pub source_dir: PathBuf,
    /// Directory converged to the source state.
    pub target_dir: PathBuf,
    /// Template data.
    pub data: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            target_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            data: Value::Object(Map::new()),
        }
    }
}

impl Config {
    /// Default location of the config file, if the platform has a config
    /// directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("dotstate.toml"))
    }

    /// Load configuration from `path` (TOML, JSON or YAML by extension).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(ConfigStore::new().load(&NormalizedPath::new(path))?)
    }

    /// Load configuration from `path`, or the defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(Error::ConfigNotFound { .. }) => {
                tracing::debug!(?path, "No config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to `path`, whose parent directory must exist.
    pub fn save(&self, path: &Path) -> Result<()> {
        Ok(ConfigStore::new().save(&NormalizedPath::new(path), self)?)
    }

    pub fn source_tree(&self) -> SourceTree {
        SourceTree::new(&self.source_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_have_empty_data_object() {
        let config = Config::default();
        assert_eq!(config.data, json!({}));
        assert!(config.source_dir.ends_with(APP_DIR));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dotstate.toml");
        std::fs::write(
            &path,
            "source_dir = \"/src\"\n\n[data]\nemail = \"a@example.com\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.source_dir, PathBuf::from("/src"));
        assert_eq!(config.target_dir, Config::default().target_dir);
        assert_eq!(config.data, json!({"email": "a@example.com"}));
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_and_reload_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dotstate.json");
        let config = Config {
            source_dir: PathBuf::from("/src"),
            target_dir: PathBuf::from("/home/alice"),
            data: json!({"hosts": ["a", "b"], "n": 2}),
        };

        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
