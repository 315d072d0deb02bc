// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `logging` configuration section.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::structured::{LogFormat, LoggerConfig, slog_level};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Route records through slog instead of env_logger
    #[serde(default)]
    pub structured: bool,

    /// `terminal` or `json` (structured mode only)
    #[serde(default = "default_format")]
    pub format: String,

    /// `trace`, `debug`, `info`, `warn`, `error` or `off`
    #[serde(default = "default_level")]
    pub level: String,

    /// Key/value pairs attached to every structured record
    #[serde(default)]
    pub static_fields: BTreeMap<String, String>,
}

fn default_format() -> String {
    "terminal".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            structured: false,
            format: default_format(),
            level: default_level(),
            static_fields: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// The configured level; unknown names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }

    /// Settings for the slog drain.
    pub fn to_logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: if self.format.eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Terminal
            },
            level: slog_level(self.level_filter()),
            static_fields: self
                .static_fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
