//! Middleware phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for unknown phase strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown middleware phase: {0}")]
pub struct UnknownPhase(pub String);

/// The three points where middlewares intercept a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MiddlewarePhase {
    /// Runs ahead of bus dispatch; may modify the context, halt the
    /// chain, or suppress the dispatch via `prevent_default`.
    Before,
    /// Runs after bus dispatch completes.
    After,
    /// Runs when a middleware in another phase fails or times out.
    Error,
}

impl MiddlewarePhase {
    /// Returns `true` for the `Before` phase.
    #[must_use]
    pub fn is_before(&self) -> bool {
        matches!(self, Self::Before)
    }

    /// Returns `true` for the `After` phase.
    #[must_use]
    pub fn is_after(&self) -> bool {
        matches!(self, Self::After)
    }

    /// Returns `true` for the `Error` phase.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for MiddlewarePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

impl FromStr for MiddlewarePhase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "error" => Ok(Self::Error),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        assert!(MiddlewarePhase::Before.is_before());
        assert!(MiddlewarePhase::After.is_after());
        assert!(MiddlewarePhase::Error.is_error());
        assert!(!MiddlewarePhase::Before.is_error());
    }

    #[test]
    fn display_and_parse_roundtrip() {
        for phase in [
            MiddlewarePhase::Before,
            MiddlewarePhase::After,
            MiddlewarePhase::Error,
        ] {
            let parsed: MiddlewarePhase = phase.to_string().parse().unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn parse_unknown() {
        let err = "around".parse::<MiddlewarePhase>().unwrap_err();
        assert_eq!(err.to_string(), "unknown middleware phase: around");
    }
}
