// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Filters, the routes that scope them to paths, and the chain that runs
//! them.
//!
//! Filters are declared under the `filters` configuration key:
//!
//! ```toml
//! [[filters]]
//! type = "header"
//! patterns = ["/api/v[0-9]+/.*"]
//! pattern_style = "REGEX"
//! methods = ["GET"]
//! order = 10
//! config = { add_response_headers = { "x-api" = "1" } }
//! ```
//!
//! `patterns` defaults to `["/**"]` and `pattern_style` to `ANT`.

mod chain;
mod route;

#[cfg(test)]
mod tests;

pub use chain::{FILTERS_KEY, FilterChain};
pub use route::{FilterRoute, FilterRouteConfig, MATCH_ALL_PATTERN};

use async_trait::async_trait;
use log::Level;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::{Filter, FilterType, HttpRequest, HttpResponse, WaypointError};
use crate::logging::structured::generate_trace_id;
use crate::{debug_fmt, error_fmt, log_fmt};

/// Constructor signature for filters registered at runtime.
pub type FilterConstructor = fn(serde_json::Value) -> Result<Arc<dyn Filter>, WaypointError>;

static FILTER_REGISTRY: Lazy<RwLock<HashMap<String, FilterConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Make a custom filter type available to configuration. Registered names
/// shadow the built-in ones.
///
/// ```rust
/// use waypoint::{Filter, FilterType, filters::register_filter};
///
/// #[derive(Debug)]
/// struct Audit;
///
/// #[async_trait::async_trait]
/// impl Filter for Audit {
///     fn filter_type(&self) -> FilterType { FilterType::Pre }
///     fn name(&self) -> &str { "audit" }
/// }
///
/// register_filter("audit", |_cfg| Ok(std::sync::Arc::new(Audit)));
/// ```
pub fn register_filter(name: &str, ctor: FilterConstructor) {
    FILTER_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string(), ctor);
}

fn registered_filter(name: &str) -> Option<FilterConstructor> {
    FILTER_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .copied()
}

/// Request context attribute holding the trace id assigned by [`LoggingFilter`].
pub const TRACE_ID_ATTRIBUTE: &str = "trace_id";

/// Configuration for the `logging` filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingFilterConfig {
    #[serde(default = "default_true")]
    pub log_request_headers: bool,

    #[serde(default = "default_true")]
    pub log_response_headers: bool,

    /// `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reuse the trace id from this header when the request carries one
    #[serde(default = "default_trace_header")]
    pub trace_id_header: String,

    #[serde(default = "default_true")]
    pub propagate_trace_id: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_trace_header() -> String {
    "X-Trace-ID".to_string()
}

impl Default for LoggingFilterConfig {
    fn default() -> Self {
        Self {
            log_request_headers: true,
            log_response_headers: true,
            log_level: default_log_level(),
            trace_id_header: default_trace_header(),
            propagate_trace_id: true,
        }
    }
}

/// Logs the request line, headers and response status, tagging both with a
/// trace id.
#[derive(Debug)]
pub struct LoggingFilter {
    config: LoggingFilterConfig,
    level: Level,
}

impl Default for LoggingFilter {
    fn default() -> Self {
        Self::new(LoggingFilterConfig::default())
    }
}

impl LoggingFilter {
    pub fn new(config: LoggingFilterConfig) -> Self {
        let level = config.log_level.parse().unwrap_or(Level::Debug);
        Self { config, level }
    }

    fn inbound_trace_id(&self, headers: &HeaderMap) -> Option<String> {
        if !self.config.propagate_trace_id {
            return None;
        }
        headers
            .get(self.config.trace_id_header.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn log_headers(&self, direction: &str, trace_id: &str, headers: &HeaderMap) {
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                log_fmt!(self.level, "LoggingFilter", "{direction} [{trace_id}] {name}: {value}");
            }
        }
    }
}

#[async_trait]
impl Filter for LoggingFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Both
    }

    fn name(&self) -> &str {
        "logging"
    }

    async fn pre_filter(&self, request: HttpRequest) -> Result<HttpRequest, WaypointError> {
        let trace_id = self
            .inbound_trace_id(&request.headers)
            .unwrap_or_else(generate_trace_id);

        log_fmt!(
            self.level,
            "LoggingFilter",
            ">> [{}] {} {}",
            trace_id,
            request.method,
            request.path
        );
        if self.config.log_request_headers {
            self.log_headers(">>", &trace_id, &request.headers);
        }

        request
            .context
            .write()
            .await
            .attributes
            .insert(TRACE_ID_ATTRIBUTE.to_string(), serde_json::Value::String(trace_id));

        Ok(request)
    }

    async fn post_filter(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, WaypointError> {
        let (trace_id, elapsed) = {
            let ctx = request.context.read().await;
            let trace_id = ctx
                .attributes
                .get(TRACE_ID_ATTRIBUTE)
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string();
            (trace_id, ctx.start_time.map(|t| t.elapsed()))
        };

        log_fmt!(
            self.level,
            "LoggingFilter",
            "<< [{}] {} {} -> {} ({:?})",
            trace_id,
            request.method,
            request.path,
            response.status,
            elapsed.unwrap_or_default()
        );
        if self.config.log_response_headers {
            self.log_headers("<<", &trace_id, &response.headers);
        }

        Ok(response)
    }
}

/// Configuration for the `header` filter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HeaderFilterConfig {
    #[serde(default)]
    pub add_request_headers: HashMap<String, String>,

    #[serde(default)]
    pub remove_request_headers: Vec<String>,

    #[serde(default)]
    pub add_response_headers: HashMap<String, String>,

    #[serde(default)]
    pub remove_response_headers: Vec<String>,
}

#[derive(Debug, Default)]
struct HeaderEdits {
    add: Vec<(HeaderName, HeaderValue)>,
    remove: Vec<HeaderName>,
}

impl HeaderEdits {
    fn parse(add: &HashMap<String, String>, remove: &[String]) -> Result<Self, WaypointError> {
        let name = |raw: &str| {
            HeaderName::from_bytes(raw.as_bytes())
                .map_err(|e| WaypointError::FilterError(format!("invalid header name '{raw}': {e}")))
        };

        let mut edits = HeaderEdits::default();
        for raw in remove {
            edits.remove.push(name(raw)?);
        }
        for (raw_name, raw_value) in add {
            let value = HeaderValue::from_str(raw_value).map_err(|e| {
                WaypointError::FilterError(format!("invalid value for header '{raw_name}': {e}"))
            })?;
            edits.add.push((name(raw_name)?, value));
        }
        Ok(edits)
    }

    fn apply(&self, headers: &mut HeaderMap) {
        for name in &self.remove {
            headers.remove(name);
        }
        for (name, value) in &self.add {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Adds, replaces and removes request and response headers.
#[derive(Debug)]
pub struct HeaderFilter {
    request: HeaderEdits,
    response: HeaderEdits,
}

impl HeaderFilter {
    /// Validate the header names and values up front.
    pub fn new(config: HeaderFilterConfig) -> Result<Self, WaypointError> {
        Ok(Self {
            request: HeaderEdits::parse(&config.add_request_headers, &config.remove_request_headers)?,
            response: HeaderEdits::parse(&config.add_response_headers, &config.remove_response_headers)?,
        })
    }
}

#[async_trait]
impl Filter for HeaderFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Both
    }

    fn name(&self) -> &str {
        "header"
    }

    async fn pre_filter(&self, mut request: HttpRequest) -> Result<HttpRequest, WaypointError> {
        self.request.apply(&mut request.headers);
        Ok(request)
    }

    async fn post_filter(
        &self,
        _request: &HttpRequest,
        mut response: HttpResponse,
    ) -> Result<HttpResponse, WaypointError> {
        self.response.apply(&mut response.headers);
        Ok(response)
    }
}

/// Builds filters from their configuration.
#[derive(Debug)]
pub struct FilterFactory;

impl FilterFactory {
    /// Create a filter of `filter_type`. Registered constructors are tried
    /// before the built-ins.
    pub fn create_filter(
        filter_type: &str,
        config: serde_json::Value,
    ) -> Result<Arc<dyn Filter>, WaypointError> {
        debug_fmt!("FilterFactory", "Creating filter of type '{}' with config: {}", filter_type, config);

        if let Some(ctor) = registered_filter(filter_type) {
            return ctor(config);
        }

        match filter_type {
            "logging" => {
                let config: LoggingFilterConfig = parse_config(filter_type, config)?;
                Ok(Arc::new(LoggingFilter::new(config)))
            }
            "header" => {
                let config: HeaderFilterConfig = parse_config(filter_type, config)?;
                Ok(Arc::new(HeaderFilter::new(config)?))
            }
            _ => {
                let err = WaypointError::FilterError(format!("Unknown filter type: {filter_type}"));
                error_fmt!("FilterFactory", "{}", err);
                Err(err)
            }
        }
    }
}

/// Deserialize a filter's `config` value; `null` means all defaults.
fn parse_config<T>(filter_type: &str, config: serde_json::Value) -> Result<T, WaypointError>
where
    T: serde::de::DeserializeOwned,
{
    let config = if config.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        config
    };

    serde_json::from_value(config).map_err(|e| {
        let err = WaypointError::FilterError(format!("Invalid {filter_type} filter config: {e}"));
        error_fmt!("FilterFactory", "{}", err);
        err
    })
}
