//! Format-agnostic configuration loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// Mode for config files written by [`ConfigStore::save`].
const CONFIG_FILE_MODE: u32 = 0o644;

/// Format-agnostic configuration store.
///
/// Automatically detects format from file extension and handles
/// serialization/deserialization transparently.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let extension = path.extension().unwrap_or("").to_lowercase();
        let format = format_name(&extension)?;
        let content = io::read_text(path)?;

        let parsed = match format {
            "TOML" => toml::from_str(&content).map_err(|e| e.to_string()),
            "JSON" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };

        parsed.map_err(|message| Error::ConfigParse {
            path: path.to_native(),
            format: format.into(),
            message,
        })
    }

    /// Save configuration to a file.
    ///
    /// Format is determined from file extension. The parent directory must
    /// exist; the file itself is replaced atomically.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let extension = path.extension().unwrap_or("").to_lowercase();
        let format = format_name(&extension)?;

        let content = match format {
            "TOML" => toml::to_string_pretty(value).map_err(|e| e.to_string()),
            "JSON" => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            _ => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        }
        .map_err(|message| Error::ConfigSerialize {
            path: path.to_native(),
            format: format.into(),
            message,
        })?;

        tracing::debug!(path = %path, format, "Saving config");
        io::write_atomic(path, content.as_bytes(), CONFIG_FILE_MODE)
    }
}

fn format_name(extension: &str) -> Result<&'static str> {
    match extension {
        "toml" => Ok("TOML"),
        "json" => Ok("JSON"),
        "yaml" | "yml" => Ok("YAML"),
        _ => Err(Error::UnsupportedFormat {
            extension: extension.to_string(),
        }),
    }
}
