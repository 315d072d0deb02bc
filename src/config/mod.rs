// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layered configuration.
//!
//! A [`Config`] is an ordered list of [`ConfigProvider`]s; a provider added
//! later overrides the ones before it for every key it knows about. The
//! usual stack is:
//!
//! 1. `FileConfigProvider` – `waypoint.{toml,json,yaml}`
//! 2. `EnvConfigProvider`  – `WAYPOINT_TRACING__SENDER__URL=http://…`
//! 3. any custom [`ConfigProvider`]
//!
//! | key              | type     | default | description                          |
//! |------------------|----------|---------|--------------------------------------|
//! | `filters`        | *array*  | `[]`    | Filter routes (see `FilterRouteConfig`) |
//! | `tracing.sender` | *object* | –       | HTTP span sender; absent means none  |
//! | `logging`        | *object* | –       | Log level, format and static fields  |

mod env;
pub mod error;
mod file;


pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::{FileConfigProvider, FileFormat};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A source of configuration values addressed by dot-separated keys.
/// Object-safe so providers can be stacked behind `Arc<dyn ConfigProvider>`.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Whether the provider has a value for `key`.
    fn has(&self, key: &str) -> bool;

    /// Name used in log lines and provider errors.
    fn provider_name(&self) -> &str;

    /// The raw JSON value stored under `key`.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;
}

/// Typed access on top of [`ConfigProvider`].
pub trait ConfigProviderExt: ConfigProvider {
    /// Deserialize the value under `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get_raw(key)?
            .map(|value| deserialize_value(key, value))
            .transpose()
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

fn deserialize_value<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, ConfigError> {
    serde_json::from_value(value)
        .map_err(|e| ConfigError::ParseError(format!("failed to deserialize '{key}': {e}")))
}

fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (name, value) in overlay {
                let merged = match base.remove(&name) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                base.insert(name, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; it overrides every provider added before it.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add an already shared provider.
    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// The assembled provider stack.
#[derive(Debug, Clone, Default)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Whether any provider knows `key`.
    pub fn has(&self, key: &str) -> bool {
        self.providers.iter().any(|p| p.has(key))
    }

    /// Names of the providers, lowest priority first.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    /// Objects are merged across providers, lowest priority first, so a
    /// provider overriding one leaf keeps its siblings from the others. Any
    /// other value replaces what came before it.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        let mut merged: Option<Value> = None;
        for provider in self.providers.iter().filter(|p| p.has(key)) {
            let Some(value) = provider.get_raw(key)? else {
                continue;
            };
            merged = Some(match merged {
                Some(base) => merge_values(base, value),
                None => value,
            });
        }
        Ok(merged)
    }

    /// Deserialize the value under `key`. Objects present in several
    /// providers are merged leaf by leaf; later providers win.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get_raw(key)?
            .map(|value| deserialize_value(key, value))
            .transpose()
    }

    /// Like [`Config::get`], falling back to `default` when the key is absent.
    pub fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// A configuration backed by a single file.
    pub fn default_file(file_path: &str) -> Result<Self, ConfigError> {
        let provider = FileConfigProvider::new(file_path)?;
        Ok(Self::builder().with_provider(provider).build())
    }
}
