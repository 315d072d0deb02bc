// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured output through slog.

use log::LevelFilter;
use slog::{Drain, Logger, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;
use uuid::Uuid;

/// Output format of the structured drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Terminal,
    /// One JSON object per line on stdout
    Json,
}

/// Settings for [`create_logger`].
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LogFormat,
    pub level: slog::Level,
    /// Key/value pairs attached to every record
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            static_fields: Vec::new(),
        }
    }
}

/// Map a `log` level filter onto the closest slog level.
pub fn slog_level(level: LevelFilter) -> slog::Level {
    match level {
        LevelFilter::Trace => slog::Level::Trace,
        LevelFilter::Debug => slog::Level::Debug,
        LevelFilter::Info => slog::Level::Info,
        LevelFilter::Warn => slog::Level::Warning,
        LevelFilter::Error => slog::Level::Error,
        LevelFilter::Off => slog::Level::Critical,
    }
}

/// Build an asynchronous slog logger.
pub fn create_logger(config: &LoggerConfig) -> Logger {
    match config.format {
        LogFormat::Terminal => {
            let decorator = TermDecorator::new().build();
            finish(FullFormat::new(decorator).build().fuse(), config)
        }
        LogFormat::Json => finish(
            Json::new(io::stdout()).add_default_keys().build().fuse(),
            config,
        ),
    }
}

fn finish<D>(drain: D, config: &LoggerConfig) -> Logger
where
    D: Drain<Ok = (), Err = slog::Never> + Send + 'static,
{
    let drain = drain.filter_level(config.level).fuse();
    let drain = Async::new(drain).build().fuse();

    let mut logger = Logger::root(drain, o!());
    for (key, value) in &config.static_fields {
        // slog keys are 'static; static fields are read once at start-up.
        let key: &'static str = Box::leak(key.clone().into_boxed_str());
        logger = logger.new(o!(key => value.clone()));
    }
    logger
}

/// A fresh trace id.
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Keeps the global slog logger installed while alive.
pub struct LoggerGuard {
    _guard: slog_scope::GlobalLoggerGuard,
}

/// Install a global slog logger built from `config`.
pub fn init_global_logger(config: &LoggerConfig) -> LoggerGuard {
    LoggerGuard {
        _guard: slog_scope::set_global_logger(create_logger(config)),
    }
}
