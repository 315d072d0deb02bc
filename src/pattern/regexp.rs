// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Regular-expression path matching.

use super::{FilterPatternStyle, PathMatcher, PatternCache, PatternError};

/// Matcher for regex patterns. A pattern must match the whole path, so
/// `/api` does not match `/api/users`.
#[derive(Debug, Default)]
pub struct RegexPathMatcher {
    pub(super) cache: PatternCache,
}

impl RegexPathMatcher {
    /// Create a matcher with an empty pattern cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn anchored(pattern: &str) -> String {
        format!("^(?:{pattern})$")
    }
}

impl PathMatcher for RegexPathMatcher {
    fn matches(&self, pattern: &str, path: &str) -> bool {
        self.cache
            .is_match(self.style(), pattern, path, Self::anchored)
    }

    fn validate(&self, pattern: &str) -> Result<(), PatternError> {
        self.cache
            .compile(self.style(), pattern, Self::anchored)
            .map(|_| ())
    }

    fn style(&self) -> FilterPatternStyle {
        FilterPatternStyle::Regex
    }
}
