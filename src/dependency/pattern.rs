//! Dependency pattern matching.
//!
//! A pattern is a dotted path whose `*` segments match exactly one path segment. A
//! pattern matches a path when it matches a prefix of it: a change below a location
//! is a change of that location.

use crate::target::{split_segments, WILDCARD};

/// Whether `path` falls under `pattern`
pub fn path_matches_pattern(path: &str, pattern: &str) -> bool {
    matched_prefix(path, pattern).is_some()
}

/// The prefix of `path` that `pattern` matched, with wildcards resolved
pub fn matched_prefix(path: &str, pattern: &str) -> Option<String> {
    let path_segments = split_segments(path)?;
    let pattern_segments = split_segments(pattern)?;
    if pattern.is_empty() || pattern_segments.len() > path_segments.len() {
        return None;
    }

    let matches = pattern_segments
        .iter()
        .zip(path_segments.iter())
        .all(|(expected, actual)| *expected == WILDCARD || expected == actual);

    if matches {
        Some(path_segments[..pattern_segments.len()].join("."))
    } else {
        None
    }
}

/// Whether `path` falls under any of `patterns`
pub fn matches_any<'a, I>(path: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    patterns
        .into_iter()
        .any(|pattern| path_matches_pattern(path, pattern))
}
