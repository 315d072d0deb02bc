// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Path pattern styles and the matchers behind them.
//!
//! A filter declares *how* its patterns should be read through a
//! [`FilterPatternStyle`]; [`resolve_matcher`] turns that tag into the
//! process-wide matcher singleton that does the actual work.
//!
//! | style   | configuration value | example            |
//! |---------|---------------------|--------------------|
//! | `Ant`   | `"ANT"` (default)   | `"/api/**/*.json"` |
//! | `Regex` | `"REGEX"`           | `"/api/v[0-9]+/.*"`|

mod ant;
mod regexp;


pub use ant::AntPathMatcher;
pub use regexp::RegexPathMatcher;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::warn_fmt;

/// Errors raised while reading or compiling path patterns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern could not be compiled for its style.
    #[error("invalid {style} pattern '{pattern}': {reason}")]
    InvalidPattern {
        style: FilterPatternStyle,
        pattern: String,
        reason: String,
    },

    /// The configured style name is not one of the known styles.
    #[error("unknown pattern style '{0}' (expected ANT or REGEX)")]
    UnknownStyle(String),
}

/// How the patterns of a filter are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterPatternStyle {
    /// Ant-style wildcards: `?`, `*` and `**`.
    #[default]
    Ant,
    /// Full regular expressions.
    Regex,
}

impl FilterPatternStyle {
    /// The upper-case tag used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterPatternStyle::Ant => "ANT",
            FilterPatternStyle::Regex => "REGEX",
        }
    }
}

impl fmt::Display for FilterPatternStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterPatternStyle {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case("ant") {
            Ok(FilterPatternStyle::Ant)
        } else if tag.eq_ignore_ascii_case("regex") {
            Ok(FilterPatternStyle::Regex)
        } else {
            Err(PatternError::UnknownStyle(s.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for FilterPatternStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Answers "does this path match this pattern" for one pattern style.
pub trait PathMatcher: fmt::Debug + Send + Sync {
    /// Whether `path` matches `pattern` in full. Invalid patterns never match.
    fn matches(&self, pattern: &str, path: &str) -> bool;

    /// Check that `pattern` is usable before it is put into service.
    fn validate(&self, pattern: &str) -> Result<(), PatternError>;

    /// The style this matcher implements.
    fn style(&self) -> FilterPatternStyle;
}

static ANT: Lazy<AntPathMatcher> = Lazy::new(AntPathMatcher::new);
static REGEX: Lazy<RegexPathMatcher> = Lazy::new(RegexPathMatcher::new);

/// The process-wide Ant-style matcher.
pub fn ant_matcher() -> &'static AntPathMatcher {
    &ANT
}

/// The process-wide regular-expression matcher.
pub fn regex_matcher() -> &'static RegexPathMatcher {
    &REGEX
}

/// Map a pattern style to the matcher that implements it.
///
/// Only `Regex` selects the regular-expression matcher; every other style
/// falls back to Ant-style matching, so a style added later resolves to the
/// default rather than failing.
pub fn resolve_matcher(style: FilterPatternStyle) -> &'static dyn PathMatcher {
    match style {
        FilterPatternStyle::Regex => regex_matcher() as &'static dyn PathMatcher,
        _ => ant_matcher(),
    }
}

/// The style used when a filter does not declare one.
pub const fn default_style() -> FilterPatternStyle {
    FilterPatternStyle::Ant
}

/// Upper bound on the number of compiled patterns kept per matcher.
const MAX_CACHED_PATTERNS: usize = 512;

/// Compiled-pattern cache shared by both matchers.
#[derive(Debug, Default)]
struct PatternCache {
    compiled: RwLock<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    /// Return the compiled form of `pattern`, translating it with `to_regex`
    /// on first use.
    fn compile(
        &self,
        style: FilterPatternStyle,
        pattern: &str,
        to_regex: impl FnOnce(&str) -> String,
    ) -> Result<Arc<Regex>, PatternError> {
        if let Some(regex) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pattern)
        {
            return Ok(regex.clone());
        }

        let regex = Regex::new(&to_regex(pattern))
            .map(Arc::new)
            .map_err(|e| PatternError::InvalidPattern {
                style,
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        if compiled.len() < MAX_CACHED_PATTERNS {
            compiled.insert(pattern.to_string(), regex.clone());
        }

        Ok(regex)
    }

    /// Match through the cache, logging and rejecting invalid patterns.
    fn is_match(
        &self,
        style: FilterPatternStyle,
        pattern: &str,
        path: &str,
        to_regex: impl FnOnce(&str) -> String,
    ) -> bool {
        match self.compile(style, pattern, to_regex) {
            Ok(regex) => regex.is_match(path),
            Err(e) => {
                warn_fmt!("PathMatcher", "{}", e);
                false
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.compiled.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
