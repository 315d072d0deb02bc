// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::config::LoggingConfig;
use super::structured::{LogFormat, create_logger, generate_trace_id, slog_level};
use log::LevelFilter;
use serde_json::json;
use std::collections::HashSet;

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();
    assert!(!config.structured);
    assert_eq!(config.format, "terminal");
    assert_eq!(config.level, "info");
    assert!(config.static_fields.is_empty());
    assert_eq!(config.level_filter(), LevelFilter::Info);
}

#[test]
fn test_logging_config_from_partial_json() {
    let config: LoggingConfig = serde_json::from_value(json!({
        "structured": true,
        "format": "JSON",
        "level": "debug",
        "static_fields": { "service": "waypoint", "env": "test" }
    }))
    .unwrap();

    assert!(config.structured);
    assert_eq!(config.level_filter(), LevelFilter::Debug);

    let logger_config = config.to_logger_config();
    assert_eq!(logger_config.format, LogFormat::Json);
    assert_eq!(logger_config.level, slog::Level::Debug);
    assert_eq!(
        logger_config.static_fields,
        vec![
            ("env".to_string(), "test".to_string()),
            ("service".to_string(), "waypoint".to_string()),
        ]
    );
}

#[test]
fn test_unknown_level_and_format_fall_back() {
    let config = LoggingConfig {
        level: "chatty".to_string(),
        format: "xml".to_string(),
        ..LoggingConfig::default()
    };
    assert_eq!(config.level_filter(), LevelFilter::Info);
    assert_eq!(config.to_logger_config().format, LogFormat::Terminal);
}

#[test]
fn test_slog_level_mapping() {
    assert_eq!(slog_level(LevelFilter::Trace), slog::Level::Trace);
    assert_eq!(slog_level(LevelFilter::Warn), slog::Level::Warning);
    assert_eq!(slog_level(LevelFilter::Error), slog::Level::Error);
    assert_eq!(slog_level(LevelFilter::Off), slog::Level::Critical);
}

#[test]
fn test_trace_ids_are_unique_uuids() {
    let ids: HashSet<String> = (0..100).map(|_| generate_trace_id()).collect();
    assert_eq!(ids.len(), 100);
    assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
}

#[test]
fn test_create_json_logger() {
    let config = LoggingConfig {
        format: "json".to_string(),
        level: "error".to_string(),
        static_fields: [("component".to_string(), "tests".to_string())].into(),
        ..LoggingConfig::default()
    };
    let logger = create_logger(&config.to_logger_config());
    slog::debug!(logger, "filtered out by level");
}

#[test]
fn test_init_is_idempotent() {
    super::init(Some(LevelFilter::Warn));
    super::init(Some(LevelFilter::Trace));
    super::log_info("LoggingTest", "still alive");
    let err = super::log_error("LoggingTest", "boom");
    assert_eq!(err, "boom");
}
