// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `tracing.sender` configuration section.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::balancer::LazyResolver;
use super::instrument::InvocationInstrumenterFactory;
use super::{HttpClientSender, SpanEncoding};
use crate::core::WaypointError;

/// Configuration key of the HTTP sender.
pub const SENDER_KEY: &str = "tracing.sender";

/// Default collector endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:9411";

/// Default path spans are posted to.
pub const DEFAULT_PATH: &str = "/api/v2/spans";

/// Largest message the collector accepts by default.
pub const DEFAULT_MESSAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Settings of the HTTP span sender.
///
/// ```toml
/// [tracing.sender]
/// url = "http://zipkin:9411"
/// encoding = "PROTO3"
/// read_timeout_ms = 2000
/// headers = { "x-tenant" = "blue" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpClientSenderConfig {
    /// Collector base URL, used when `urls` is empty
    #[serde(default = "default_url")]
    pub url: String,

    /// Service references handed to the load balancer resolver
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub encoding: SpanEncoding,

    #[serde(default = "default_message_max_bytes")]
    pub message_max_bytes: usize,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_message_max_bytes() -> usize {
    DEFAULT_MESSAGE_MAX_BYTES
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    1_000
}

impl Default for HttpClientSenderConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            urls: Vec::new(),
            path: default_path(),
            encoding: SpanEncoding::default(),
            message_max_bytes: default_message_max_bytes(),
            read_timeout_ms: default_read_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            headers: BTreeMap::new(),
        }
    }
}

impl HttpClientSenderConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// A builder seeded with this configuration.
    pub fn builder(&self) -> HttpClientSenderBuilder {
        HttpClientSenderBuilder {
            config: self.clone(),
            invocation_instrumenter_factories: Vec::new(),
        }
    }
}

/// Assembles an [`HttpClientSender`].
#[derive(Debug)]
pub struct HttpClientSenderBuilder {
    config: HttpClientSenderConfig,
    invocation_instrumenter_factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
}

impl HttpClientSenderBuilder {
    /// Instrumenters wrapping every send, outermost first.
    pub fn invocation_instrumenter_factories(
        mut self,
        factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
    ) -> Self {
        self.invocation_instrumenter_factories = factories;
        self
    }

    /// Build the sender. `resolver` is only consulted on the first send and
    /// only when `urls` is set.
    pub fn build(self, resolver: LazyResolver) -> Result<HttpClientSender, WaypointError> {
        HttpClientSender::new(self.config, self.invocation_instrumenter_factories, resolver)
    }
}
