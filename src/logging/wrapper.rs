// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contextual logging macros.
//!
//! Each macro prefixes the message with a component tag and forwards to the
//! `log` facade, so the same call sites work with `env_logger` and with the
//! `slog` bridge:
//!
//! ```rust
//! waypoint::debug_fmt!("FilterChain", "{} routes loaded", 3);
//! ```

/// Log an error message tagged with a component.
#[macro_export]
macro_rules! error_fmt {
    ($context:expr, $($arg:tt)+) => {
        log::error!("[{}] {}", $context, format_args!($($arg)+))
    };
}

/// Log a warning tagged with a component.
#[macro_export]
macro_rules! warn_fmt {
    ($context:expr, $($arg:tt)+) => {
        log::warn!("[{}] {}", $context, format_args!($($arg)+))
    };
}

/// Log an info message tagged with a component.
#[macro_export]
macro_rules! info_fmt {
    ($context:expr, $($arg:tt)+) => {
        log::info!("[{}] {}", $context, format_args!($($arg)+))
    };
}

/// Log a debug message tagged with a component.
#[macro_export]
macro_rules! debug_fmt {
    ($context:expr, $($arg:tt)+) => {
        log::debug!("[{}] {}", $context, format_args!($($arg)+))
    };
}

/// Log a trace message tagged with a component.
#[macro_export]
macro_rules! trace_fmt {
    ($context:expr, $($arg:tt)+) => {
        log::trace!("[{}] {}", $context, format_args!($($arg)+))
    };
}

/// Log at a runtime-selected [`log::Level`], tagged with a component.
#[macro_export]
macro_rules! log_fmt {
    ($level:expr, $context:expr, $($arg:tt)+) => {
        log::log!($level, "[{}] {}", $context, format_args!($($arg)+))
    };
}
