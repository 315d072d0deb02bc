// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration errors.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested key is not present in any provider.
    #[error("configuration key not found")]
    NotFound,

    /// A value could not be parsed or deserialized.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Reading a configuration source failed.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// A provider rejected its source.
    #[error("provider error: {provider}: {message}")]
    ProviderError { provider: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::ProviderError`].
    pub fn provider_error<P: fmt::Display, M: fmt::Display>(provider: P, message: M) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}
