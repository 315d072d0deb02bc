// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ant-style path matching.
//!
//! Patterns are translated segment by segment into an anchored regular
//! expression:
//!
//! * `?` matches exactly one character other than `/`
//! * `*` matches zero or more characters within a segment
//! * `**` as a whole segment matches zero or more segments
//!
//! Everything else is literal.

use super::{FilterPatternStyle, PathMatcher, PatternCache, PatternError};

const SEPARATOR: char = '/';
const DOUBLE_WILDCARD: &str = "**";

/// Matcher for Ant-style patterns such as `/static/**/*.css`.
#[derive(Debug, Default)]
pub struct AntPathMatcher {
    pub(super) cache: PatternCache,
}

impl AntPathMatcher {
    /// Create a matcher with an empty pattern cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate an Ant-style pattern into an anchored regex.
    pub(crate) fn pattern_to_regex(pattern: &str) -> String {
        let segments: Vec<&str> = pattern.split(SEPARATOR).collect();
        let last = segments.len() - 1;
        let mut regex = String::with_capacity(pattern.len() * 2 + 2);
        regex.push('^');

        let leading_wildcard = segments[0] == DOUBLE_WILDCARD;

        for (i, segment) in segments.iter().enumerate() {
            if *segment == DOUBLE_WILDCARD {
                match (i == 0, i == last) {
                    (true, true) => regex.push_str(".*"),
                    // `**/rest`: any prefix ending in a separator, or none
                    (true, false) => regex.push_str("(?:.*/)?"),
                    (false, _) if i == 1 && leading_wildcard => regex.push_str(".*"),
                    // `head/**` and `head/**/rest`: the separator is optional
                    // along with whatever follows it
                    (false, _) => regex.push_str("(?:/.*)?"),
                }
                continue;
            }

            // A separator is owed unless a leading `**` already consumed it.
            if i > 0 && !(i == 1 && leading_wildcard) {
                regex.push(SEPARATOR);
            }
            Self::push_segment(&mut regex, segment);
        }

        regex.push('$');
        regex
    }

    fn push_segment(regex: &mut String, segment: &str) {
        let mut buf = [0u8; 4];
        for c in segment.chars() {
            match c {
                '*' => regex.push_str("[^/]*"),
                '?' => regex.push_str("[^/]"),
                _ => regex.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
    }
}

impl PathMatcher for AntPathMatcher {
    fn matches(&self, pattern: &str, path: &str) -> bool {
        self.cache
            .is_match(self.style(), pattern, path, Self::pattern_to_regex)
    }

    fn validate(&self, pattern: &str) -> Result<(), PatternError> {
        self.cache
            .compile(self.style(), pattern, Self::pattern_to_regex)
            .map(|_| ())
    }

    fn style(&self) -> FilterPatternStyle {
        FilterPatternStyle::Ant
    }
}
