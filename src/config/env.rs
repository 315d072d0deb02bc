// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable configuration provider.
//!
//! `WAYPOINT_TRACING__SENDER__READ_TIMEOUT_MS=500` becomes the key
//! `tracing.sender.read_timeout_ms`: the prefix is stripped, the rest is
//! lower-cased and `__` separates nesting levels. Asking for a key that
//! names an object (`tracing.sender`) assembles it from its leaves.
//!
//! Single underscores are kept, and variable names cannot carry `-`, so
//! `WAYPOINT_TRACING__SENDER__HEADERS__X_TENANT` sets the header `x_tenant`.
//! Hyphenated names such as `x-tenant` can only be set from a file, or as a
//! whole JSON object:
//! `WAYPOINT_TRACING__SENDER__HEADERS='{"x-tenant":"acme"}'`.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::env;

use super::ConfigError;
use super::ConfigProvider;

const DEFAULT_PREFIX: &str = "WAYPOINT_";
const NESTING_SEPARATOR: &str = "__";

/// Configuration provider backed by process environment variables.
#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    /// Snapshot of matching variables, keyed by configuration key.
    cache: BTreeMap<String, String>,
}

impl EnvConfigProvider {
    /// Snapshot every variable starting with `prefix`.
    pub fn new(prefix: &str) -> Self {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: BTreeMap::new(),
        };
        provider.refresh_cache();
        provider
    }

    /// Re-read the environment.
    pub fn refresh_cache(&mut self) {
        self.cache = env::vars()
            .filter_map(|(name, value)| {
                name.strip_prefix(&self.prefix)
                    .map(|rest| (Self::config_key(rest), value))
            })
            .collect();
    }

    fn config_key(variable: &str) -> String {
        variable
            .to_lowercase()
            .split(NESTING_SEPARATOR)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Interpret a variable as JSON when it parses as JSON, else as a string.
    fn parse_value(value: &str) -> Value {
        if let Ok(parsed) = serde_json::from_str(value) {
            return parsed;
        }
        if value.eq_ignore_ascii_case("true") {
            return json!(true);
        }
        if value.eq_ignore_ascii_case("false") {
            return json!(false);
        }
        json!(value)
    }

    /// Variables nested below `key`, with the `key.` part removed.
    fn children<'a>(&'a self, key: &str) -> impl Iterator<Item = (&'a str, &'a String)> {
        let prefix = format!("{key}.");
        let skip = prefix.len();
        self.cache
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(move |(k, v)| (&k[skip..], v))
    }

    fn assemble(&self, key: &str) -> Option<Value> {
        let mut root = Map::new();
        for (path, raw) in self.children(key) {
            insert_path(&mut root, path, Self::parse_value(raw));
        }
        (!root.is_empty()).then_some(Value::Object(root))
    }
}

fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            root.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_path(child, rest, value);
            }
        }
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.cache.contains_key(key) || self.children(key).next().is_some()
    }

    fn provider_name(&self) -> &str {
        "env"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        match self.cache.get(key) {
            Some(value) => Ok(Some(Self::parse_value(value))),
            None => Ok(self.assemble(key)),
        }
    }
}
