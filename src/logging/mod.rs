// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging setup.
//!
//! Everything in the crate logs through the `log` facade (usually via the
//! `*_fmt!` macros in [`wrapper`]). By default records go to `env_logger`;
//! with `logging.structured = true` they are bridged into a `slog` drain
//! instead, formatted for a terminal or as JSON.

pub mod config;
pub mod structured;
pub mod wrapper;

#[cfg(test)]
mod tests;

use log::{LevelFilter, error, info};
use once_cell::sync::OnceCell;
use std::sync::Once;

use self::config::LoggingConfig;
use self::structured::{LoggerGuard, init_global_logger};

static INIT: Once = Once::new();
static STRUCTURED_GUARD: OnceCell<LoggerGuard> = OnceCell::new();

/// Initialise plain `env_logger` output at `level` (default `info`).
/// `RUST_LOG` still wins when set. Only the first call has any effect.
pub fn init(level: Option<LevelFilter>) {
    init_with_config(level, None);
}

/// Initialise logging from a [`LoggingConfig`]. An explicit `level`
/// overrides the configured one. Only the first call has any effect.
pub fn init_with_config(level: Option<LevelFilter>, config: Option<LoggingConfig>) {
    INIT.call_once(|| {
        let config = config.unwrap_or_default();
        let level = level.unwrap_or_else(|| config.level_filter());

        if config.structured {
            init_structured(level, &config);
        } else {
            init_env_logger(level);
        }
    });
}

fn init_env_logger(level: LevelFilter) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level.as_str().to_lowercase());

    let result = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(true)
        .try_init();

    match result {
        Ok(()) => info!("Logging initialized at level: {}", log::max_level()),
        // Somebody else installed a logger first; keep theirs.
        Err(e) => eprintln!("waypoint: logger already initialised: {e}"),
    }
}

fn init_structured(level: LevelFilter, config: &LoggingConfig) {
    let mut logger_config = config.to_logger_config();
    logger_config.level = structured::slog_level(level);
    STRUCTURED_GUARD.get_or_init(|| init_global_logger(&logger_config));

    match level.to_level() {
        Some(max) => {
            if let Err(e) = slog_stdlog::init_with_level(max) {
                eprintln!("waypoint: could not bridge log records into slog: {e}");
                return;
            }
        }
        None => log::set_max_level(LevelFilter::Off),
    }

    info!(
        "Structured logging initialized ({:?}) at level: {}",
        logger_config.format,
        log::max_level()
    );
}

/// Log an error with context and hand it back, for use in `map_err` chains.
pub fn log_error<E: std::fmt::Display>(context: &str, err: E) -> E {
    error!("[{}] {}", context, err);
    err
}

/// Log an info message with context.
pub fn log_info<M: std::fmt::Display>(context: &str, msg: M) {
    info!("[{}] {}", context, msg);
}
