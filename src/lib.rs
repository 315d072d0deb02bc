// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waypoint - configuration-driven filter selection and span reporting for
//! HTTP services.
//!
//! Filters are bound to request paths with patterns in one of two styles:
//!
//! - **ANT** (the default): `?` matches one character, `*` anything within a
//!   path segment and `**` any number of segments.
//! - **REGEX**: the pattern is a regular expression matched against the
//!   whole path.
//!
//! [`resolve_matcher`] picks the matcher for a style; anything that is not
//! `REGEX` is matched Ant-style.
//!
//! # Configuration
//!
//! ```toml
//! [[filters]]
//! type = "logging"
//!
//! [[filters]]
//! type = "header"
//! patterns = ["/api/v[0-9]+/.*"]
//! pattern_style = "REGEX"
//! config = { add_response_headers = { "x-api" = "1" } }
//!
//! [tracing.sender]
//! url = "http://zipkin:9411"
//! ```
//!
//! A span sender is only built when `tracing.sender` is present, and only
//! when none was registered on the loader already.
//!
//! # Custom Filters
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use waypoint::{Filter, FilterRoute, FilterType, HttpRequest, WaypointError, WaypointLoader};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Audit;
//!
//! #[async_trait]
//! impl Filter for Audit {
//!     fn filter_type(&self) -> FilterType {
//!         FilterType::Pre
//!     }
//!
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     async fn pre_filter(&self, request: HttpRequest) -> Result<HttpRequest, WaypointError> {
//!         Ok(request)
//!     }
//! }
//!
//! # async fn run() -> Result<(), waypoint::LoaderError> {
//! let waypoint = WaypointLoader::new()
//!     .with_config_file("waypoint.toml")
//!     .with_filter_route(FilterRoute::new(Arc::new(Audit)).with_pattern("/admin/**"))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod filters;
pub mod loader;
pub mod logging;
pub mod pattern;
pub mod sender;

pub use config::{Config, ConfigError, ConfigProvider, ConfigProviderExt};
pub use core::{
    Filter, FilterType, HttpMethod, HttpRequest, HttpResponse, RequestContext, RequestHandler,
    ResponseContext, WaypointError,
};
pub use filters::{FilterChain, FilterFactory, FilterRoute, FilterRouteConfig, HeaderFilter, LoggingFilter};
pub use loader::{LoaderError, Waypoint, WaypointLoader};
pub use pattern::{FilterPatternStyle, PathMatcher, PatternError, default_style, resolve_matcher};
pub use sender::{
    HttpClientSender, HttpClientSenderConfig, HttpClientSenderFactory, LazyResolver, SpanEncoding,
    SpanSender,
};
