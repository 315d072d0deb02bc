// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A filter bound to the paths and methods it applies to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::FilterFactory;
use crate::core::{Filter, HttpMethod, WaypointError};
use crate::pattern::{FilterPatternStyle, PatternError, default_style, resolve_matcher};
use crate::trace_fmt;

/// Ant pattern matching every path.
pub const MATCH_ALL_PATTERN: &str = "/**";

fn default_patterns() -> Vec<String> {
    vec![MATCH_ALL_PATTERN.to_string()]
}

/// One entry of the `filters` configuration array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRouteConfig {
    /// Filter type understood by [`FilterFactory`]
    #[serde(rename = "type")]
    pub type_: String,

    /// Filter-specific configuration
    #[serde(default)]
    pub config: serde_json::Value,

    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    /// How `patterns` are interpreted; absent means ANT
    #[serde(default)]
    pub pattern_style: Option<FilterPatternStyle>,

    /// Restrict the filter to these methods; empty means all
    #[serde(default)]
    pub methods: Vec<HttpMethod>,

    /// Lower orders run first
    #[serde(default)]
    pub order: i32,
}

/// A filter together with the requests it applies to.
#[derive(Clone)]
pub struct FilterRoute {
    filter: Arc<dyn Filter>,
    patterns: Vec<String>,
    style: FilterPatternStyle,
    methods: Vec<HttpMethod>,
    order: i32,
    // still holding the catch-all set by `new`
    implicit_patterns: bool,
}

impl fmt::Debug for FilterRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRoute")
            .field("filter", &self.filter.name())
            .field("patterns", &self.patterns)
            .field("style", &self.style)
            .field("methods", &self.methods)
            .field("order", &self.order)
            .finish()
    }
}

impl FilterRoute {
    /// A route applying `filter` to every path and method.
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        Self {
            filter,
            patterns: default_patterns(),
            style: default_style(),
            methods: Vec::new(),
            order: 0,
            implicit_patterns: true,
        }
    }

    /// Replace the default catch-all with a single pattern. Further calls add
    /// patterns.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        if self.implicit_patterns {
            self.patterns.clear();
            self.implicit_patterns = false;
        }
        self.patterns.push(pattern.into());
        self
    }

    /// Replace all patterns.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self.implicit_patterns = false;
        self
    }

    pub fn with_style(mut self, style: FilterPatternStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Build a route from configuration, creating its filter.
    pub fn from_config(config: FilterRouteConfig) -> Result<Self, WaypointError> {
        let filter = FilterFactory::create_filter(&config.type_, config.config)?;
        let route = Self {
            filter,
            patterns: config.patterns,
            style: config.pattern_style.unwrap_or_else(default_style),
            methods: config.methods,
            order: config.order,
            implicit_patterns: false,
        };
        route.validate()?;
        Ok(route)
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub fn name(&self) -> &str {
        self.filter.name()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn style(&self) -> FilterPatternStyle {
        self.style
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    /// Check every pattern against the matcher of the route's style.
    pub fn validate(&self) -> Result<(), PatternError> {
        let matcher = resolve_matcher(self.style);
        self.patterns.iter().try_for_each(|p| matcher.validate(p))
    }

    /// Whether the filter applies to `method` and `path`.
    pub fn matches(&self, method: HttpMethod, path: &str) -> bool {
        if !self.methods.is_empty() && !self.methods.contains(&method) {
            return false;
        }

        let matcher = resolve_matcher(self.style);
        let matched = self.patterns.iter().any(|p| matcher.matches(p, path));
        trace_fmt!(
            "FilterRoute",
            "{} {} {} {} against {:?}",
            self.filter.name(),
            if matched { "matches" } else { "skips" },
            method,
            path,
            self.patterns
        );
        matched
    }
}
