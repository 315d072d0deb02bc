// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-based configuration provider.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;
use super::ConfigProvider;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// `.json`
    Json,
    /// `.toml`
    Toml,
    /// `.yaml` / `.yml`
    Yaml,
}

impl FileFormat {
    /// Detect the format from the file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    /// Parse `content` into a JSON object.
    fn parse(self, content: &str) -> Result<Map<String, Value>, ConfigError> {
        let value = match self {
            FileFormat::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| ConfigError::provider_error("file", format!("invalid JSON: {e}")))?,
            FileFormat::Toml => {
                let parsed: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::provider_error("file", format!("invalid TOML: {e}")))?;
                serde_json::to_value(parsed).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert TOML: {e}"))
                })?
            }
            FileFormat::Yaml => {
                let parsed: serde_yaml::Value = serde_yaml::from_str(content)
                    .map_err(|e| ConfigError::provider_error("file", format!("invalid YAML: {e}")))?;
                serde_json::to_value(parsed).map_err(|e| {
                    ConfigError::provider_error("file", format!("failed to convert YAML: {e}"))
                })?
            }
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::provider_error(
                "file",
                "root configuration must be an object",
            )),
        }
    }
}

/// Configuration provider backed by a JSON, TOML or YAML file read once at
/// construction.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    format: FileFormat,
    data: Map<String, Value>,
}

impl FileConfigProvider {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let path = PathBuf::from(path);
        let format = FileFormat::from_extension(&path)
            .ok_or_else(|| ConfigError::provider_error("file", "unsupported file format"))?;

        let content = fs::read_to_string(&path).map_err(|e| {
            ConfigError::provider_error("file", format!("failed to read {}: {e}", path.display()))
        })?;
        let data = format.parse(&content)?;

        Ok(Self { path, format, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Walk a dot-separated key through nested objects; numeric parts index
    /// into arrays (`filters.0.type`).
    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => current.get(part)?,
            };
        }
        Some(current)
    }
}

impl ConfigProvider for FileConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn provider_name(&self) -> &str {
        "file"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.lookup(key).cloned())
    }
}
