// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – requests, responses, filters & the error type.
//!
//! Everything that moves through a filter chain is defined here. Matching
//! lives in `pattern`, chain assembly in `filters`.


use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::pattern::PatternError;

/// Errors that can occur while filtering requests or reporting spans.
#[derive(Error, Debug)]
pub enum WaypointError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Timeout error
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Path pattern error
    #[error("pattern error: {0}")]
    PatternError(#[from] PatternError),

    /// Filter error
    #[error("filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Span sender error
    #[error("sender error: {0}")]
    SenderError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::error::ConfigError> for WaypointError {
    fn from(err: crate::config::error::ConfigError) -> Self {
        WaypointError::ConfigError(err.to_string())
    }
}

/// HTTP methods a filter route can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
    Connect,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            "CONNECT" => Ok(HttpMethod::Connect),
            _ => Err(WaypointError::Other(format!("unsupported HTTP method: {s}"))),
        }
    }
}

/// An inbound HTTP request as seen by filters.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub context: Arc<RwLock<RequestContext>>,
}

impl HttpRequest {
    /// Create a request with no query, headers or body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: Arc::new(RwLock::new(RequestContext {
                start_time: Some(Instant::now()),
                ..RequestContext::default()
            })),
        }
    }
}

/// An outbound HTTP response as seen by filters.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub context: Arc<RwLock<ResponseContext>>,
}

impl HttpResponse {
    /// Create an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            context: Arc::new(RwLock::new(ResponseContext::default())),
        }
    }
}

/// Context data attached to a request and shared between filters.
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    /// The original client's IP address
    pub client_ip: Option<String>,
    /// When the request entered the chain
    pub start_time: Option<Instant>,
    /// Custom attributes set by filters
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Context data attached to a response.
#[derive(Debug, Default, Clone)]
pub struct ResponseContext {
    /// When the handler produced the response
    pub receive_time: Option<Instant>,
    /// Custom attributes set by filters
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Describes when a filter should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Applied before the handler runs
    Pre,
    /// Applied after the handler has produced a response
    Post,
    /// Applied before and after
    Both,
}

impl FilterType {
    pub fn is_pre(&self) -> bool {
        matches!(self, FilterType::Pre | FilterType::Both)
    }

    pub fn is_post(&self) -> bool {
        matches!(self, FilterType::Post | FilterType::Both)
    }
}

/// A filter that processes requests and responses.
#[async_trait::async_trait]
pub trait Filter: fmt::Debug + Send + Sync {
    /// When the filter runs.
    fn filter_type(&self) -> FilterType;

    /// Name shown in logs and used to remove the filter from a chain.
    fn name(&self) -> &str;

    /// Process a request before the handler sees it.
    async fn pre_filter(&self, request: HttpRequest) -> Result<HttpRequest, WaypointError> {
        Ok(request)
    }

    /// Process a response after the handler has produced it.
    async fn post_filter(
        &self,
        _request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, WaypointError> {
        Ok(response)
    }
}

/// The terminal step of a filter chain.
#[async_trait::async_trait]
pub trait RequestHandler: fmt::Debug + Send + Sync {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, WaypointError>;
}
