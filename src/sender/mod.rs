// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reporting encoded spans to a collector over HTTP.
//!
//! The sender is configured under `tracing.sender`; see
//! [`HttpClientSenderConfig`]. Payloads are opaque: whatever encodes the
//! spans also picks the matching [`SpanEncoding`].

mod balancer;
mod config;
mod factory;
mod instrument;


pub use balancer::{
    FixedLoadBalancer, LazyResolver, LoadBalancer, LoadBalancerResolver, StaticLoadBalancerResolver,
};
pub use config::{
    DEFAULT_MESSAGE_MAX_BYTES, DEFAULT_PATH, DEFAULT_SERVER_URL, HttpClientSenderBuilder,
    HttpClientSenderConfig, SENDER_KEY,
};
pub use factory::HttpClientSenderFactory;
pub use instrument::{InvocationInstrumenter, InvocationInstrumenterFactory, LoggingInstrumenterFactory};

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;

use crate::core::WaypointError;
use crate::{debug_fmt, error_fmt, warn_fmt};
use instrument::InvocationScope;

/// Wire format of the span payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanEncoding {
    /// A JSON array of spans
    #[default]
    Json,
    /// Concatenated protobuf `ListOfSpans` fields
    Proto3,
}

impl SpanEncoding {
    pub const fn media_type(self) -> &'static str {
        match self {
            SpanEncoding::Json => "application/json",
            SpanEncoding::Proto3 => "application/x-protobuf",
        }
    }

    /// A message containing no spans.
    pub fn empty_list(self) -> Bytes {
        match self {
            SpanEncoding::Json => Bytes::from_static(b"[]"),
            SpanEncoding::Proto3 => Bytes::new(),
        }
    }
}

impl fmt::Display for SpanEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpanEncoding::Json => "JSON",
            SpanEncoding::Proto3 => "PROTO3",
        })
    }
}

/// Delivers encoded span messages.
#[async_trait]
pub trait SpanSender: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn encoding(&self) -> SpanEncoding;

    /// Largest payload [`SpanSender::send`] accepts.
    fn message_max_bytes(&self) -> usize;

    async fn send(&self, payload: Bytes) -> Result<(), WaypointError>;

    /// Send an empty message to verify the collector is reachable.
    async fn check(&self) -> Result<(), WaypointError>;
}

/// Posts span messages to a collector with `reqwest`.
#[derive(Debug)]
pub struct HttpClientSender {
    config: HttpClientSenderConfig,
    client: Client,
    instrumenter_factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
    resolver: LazyResolver,
    balancer: OnceCell<Arc<dyn LoadBalancer>>,
}

impl HttpClientSender {
    pub(crate) fn new(
        config: HttpClientSenderConfig,
        instrumenter_factories: Vec<Arc<dyn InvocationInstrumenterFactory>>,
        resolver: LazyResolver,
    ) -> Result<Self, WaypointError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .default_headers(default_headers(&config)?)
            .build()?;

        let balancer = OnceCell::new();
        if config.urls.is_empty() {
            let fixed: Arc<dyn LoadBalancer> = Arc::new(FixedLoadBalancer::new(config.url.clone()));
            let _ = balancer.set(fixed);
        }

        debug_fmt!(
            "HttpClientSender",
            "Created sender for {} with {} instrumenter factories",
            if config.urls.is_empty() { config.url.clone() } else { format!("{:?}", config.urls) },
            instrumenter_factories.len()
        );

        Ok(Self {
            config,
            client,
            instrumenter_factories,
            resolver,
            balancer,
        })
    }

    pub fn config(&self) -> &HttpClientSenderConfig {
        &self.config
    }

    pub fn instrumenter_factories(&self) -> &[Arc<dyn InvocationInstrumenterFactory>] {
        &self.instrumenter_factories
    }

    /// The load balancer, resolved from `urls` on first use. A failed
    /// resolution is retried on the next call.
    fn balancer(&self) -> Result<&Arc<dyn LoadBalancer>, WaypointError> {
        self.balancer.get_or_try_init(|| {
            self.resolver.get().resolve(&self.config.urls).ok_or_else(|| {
                WaypointError::SenderError(format!(
                    "No load balancer available for references: {:?}",
                    self.config.urls
                ))
            })
        })
    }

    fn endpoint(&self, base: &str) -> String {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.config.path.trim_start_matches('/')
        )
    }

    async fn post(&self, payload: Bytes) -> Result<(), WaypointError> {
        let base = self.balancer()?.select().await?;
        let endpoint = self.endpoint(&base);
        let read_timeout = self.config.read_timeout();

        let request = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, self.config.encoding.media_type())
            .body(payload);

        let response = match timeout(read_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(WaypointError::ClientError(e)),
            Err(_) => return Err(WaypointError::Timeout(read_timeout)),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(WaypointError::SenderError(format!(
            "{endpoint} responded with {status}: {body}"
        )))
    }
}

fn default_headers(config: &HttpClientSenderConfig) -> Result<HeaderMap, WaypointError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| WaypointError::ConfigError(format!("invalid sender header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| WaypointError::ConfigError(format!("invalid value for sender header '{name}': {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl SpanSender for HttpClientSender {
    fn name(&self) -> &str {
        "HttpClientSender"
    }

    fn encoding(&self) -> SpanEncoding {
        self.config.encoding
    }

    fn message_max_bytes(&self) -> usize {
        self.config.message_max_bytes
    }

    async fn send(&self, payload: Bytes) -> Result<(), WaypointError> {
        if payload.len() > self.config.message_max_bytes {
            let err = WaypointError::SenderError(format!(
                "message of {} bytes exceeds the limit of {} bytes",
                payload.len(),
                self.config.message_max_bytes
            ));
            warn_fmt!("HttpClientSender", "{}", err);
            return Err(err);
        }

        let _scope = InvocationScope::open(&self.instrumenter_factories);
        self.post(payload).await.inspect_err(|e| {
            error_fmt!("HttpClientSender", "Failed to send spans: {}", e);
        })
    }

    async fn check(&self) -> Result<(), WaypointError> {
        self.send(self.config.encoding.empty_list()).await
    }
}
