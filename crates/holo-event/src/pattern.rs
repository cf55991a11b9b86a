//! Event-name pattern matching.
//!
//! Event names are colon-separated segments:
//!
//! ```text
//! NAME := <segment> (":" <segment>)*
//! ```
//!
//! Patterns use the same shape with `*` as a segment wildcard. A single
//! `*` pattern matches any name regardless of segment count.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from pattern parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern string was empty.
    #[error("empty pattern")]
    Empty,

    /// A segment between colons was empty (e.g., `"window:"`).
    #[error("empty segment in pattern: {0}")]
    EmptySegment(String),
}

/// A single segment in a name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternSegment {
    /// Matches exactly the given string.
    Exact(String),
    /// Matches any single segment.
    Wildcard,
}

impl PatternSegment {
    /// Returns `true` if this segment matches the given value.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exact(s) => s == value,
            Self::Wildcard => true,
        }
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => f.write_str(s),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// A parsed event-name pattern.
///
/// # Examples
///
/// ```text
/// "window:resize" → [Exact("window"), Exact("resize")]
/// "window:*"      → [Exact("window"), Wildcard]
/// "*"             → match-all
/// ```
///
/// ```
/// use holo_event::NamePattern;
///
/// let p: NamePattern = "window:*".parse().unwrap();
/// assert!(p.matches("window:resize"));
/// assert!(p.matches("window:focus"));
/// assert!(!p.matches("app:opened"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePattern {
    segments: Vec<PatternSegment>,
}

impl NamePattern {
    /// Parses a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for empty patterns or empty segments.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        let mut segments = Vec::new();
        for raw in pattern.split(':') {
            if raw.is_empty() {
                return Err(PatternError::EmptySegment(pattern.to_string()));
            }
            segments.push(if raw == "*" {
                PatternSegment::Wildcard
            } else {
                PatternSegment::Exact(raw.to_string())
            });
        }
        Ok(Self { segments })
    }

    /// Returns the match-all pattern (`*`).
    #[must_use]
    pub fn any() -> Self {
        Self {
            segments: vec![PatternSegment::Wildcard],
        }
    }

    /// Returns `true` if the pattern matches the given event name.
    ///
    /// Segment counts must agree, except for the single-`*` pattern
    /// which matches any name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.segments == [PatternSegment::Wildcard] {
            return true;
        }
        let parts: Vec<&str> = name.split(':').collect();
        if parts.len() != self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(parts)
            .all(|(seg, part)| seg.matches(part))
    }
}

impl FromStr for NamePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.segments.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(":"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let p = NamePattern::parse("window:resize").unwrap();
        assert!(p.matches("window:resize"));
        assert!(!p.matches("window:focus"));
        assert!(!p.matches("window"));
    }

    #[test]
    fn wildcard_segment() {
        let p = NamePattern::parse("window:*").unwrap();
        assert!(p.matches("window:resize"));
        assert!(p.matches("window:close"));
        assert!(!p.matches("app:opened"));
        // Segment counts must agree
        assert!(!p.matches("window:resize:extra"));
    }

    #[test]
    fn match_all() {
        let p = NamePattern::any();
        assert!(p.matches("window:resize"));
        assert!(p.matches("a"));
        assert!(p.matches("a:b:c"));
    }

    #[test]
    fn leading_wildcard() {
        let p = NamePattern::parse("*:opened").unwrap();
        assert!(p.matches("app:opened"));
        assert!(p.matches("doc:opened"));
        assert!(!p.matches("app:closed"));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(NamePattern::parse(""), Err(PatternError::Empty));
        assert!(matches!(
            NamePattern::parse("window:"),
            Err(PatternError::EmptySegment(_))
        ));
        assert!(matches!(
            NamePattern::parse(":resize"),
            Err(PatternError::EmptySegment(_))
        ));
    }

    #[test]
    fn display_roundtrip() {
        for raw in ["window:resize", "window:*", "*"] {
            let p = NamePattern::parse(raw).unwrap();
            assert_eq!(p.to_string(), raw);
            assert_eq!(raw.parse::<NamePattern>().unwrap(), p);
        }
    }
}
