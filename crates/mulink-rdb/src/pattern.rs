//! Key patterns for watches and subkey listings.
//!
//! Keys are `/`-separated paths. A pattern segment that is exactly `*`
//! stands for zero or more whole segments, so `/system/*/value` covers
//! `/system/value` and `/system/a/b/value` but never `/system/a/valueno`.
//! A `*` inside a longer segment is literal.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
}

/// A parsed key or key pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    source: String,
    segments: Vec<Segment>,
}

impl KeyPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let mut segments: Vec<Segment> = Vec::new();
        for part in source.split('/') {
            let segment = match part {
                "*" => Segment::Any,
                other => Segment::Literal(other.to_owned()),
            };
            // `*/*` matches exactly what `*` does.
            if segment == Segment::Any && segments.last() == Some(&Segment::Any) {
                continue;
            }
            segments.push(segment);
        }
        Self { source, segments }
    }

    /// Whether any segment is a wildcard.
    pub fn is_pattern(&self) -> bool {
        self.segments.contains(&Segment::Any)
    }

    /// Whether `key` is covered by this pattern.
    ///
    /// A pattern with no wildcard matches only the identical key.
    pub fn matches(&self, key: &str) -> bool {
        let parts: Vec<&str> = key.split('/').collect();
        match_segments(&self.segments, &parts)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn match_segments(pattern: &[Segment], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((Segment::Any, rest)) => {
            (0..=key.len()).any(|skip| match_segments(rest, &key[skip..]))
        }
        Some((Segment::Literal(literal), rest)) => match key.split_first() {
            Some((first, tail)) => first == literal && match_segments(rest, tail),
            None => false,
        },
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}
