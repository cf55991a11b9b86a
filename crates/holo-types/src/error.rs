//! Unified error interface for the Holodesk core.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so the
//! embedding shell can handle failures uniformly: match on a stable
//! machine-readable code, and consult `is_recoverable()` to decide
//! between retrying, surfacing an error state, or giving up.
//!
//! # Code Convention
//!
//! Codes are `UPPER_SNAKE_CASE`, prefixed by the owning layer:
//!
//! | Prefix | Layer |
//! |--------|-------|
//! | `BUS_` | event bus |
//! | `MW_` | middleware executor |
//! | `LIFECYCLE_` | lifecycle manager |
//! | `STORE_` | persistence store |
//! | `ENGINE_` | shell engine |
//!
//! Codes are an API contract: once published they do not change.
//!
//! # Example
//!
//! ```
//! use holo_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum DockError {
//!     AppNotFound(String),
//!     Busy,
//! }
//!
//! impl ErrorCode for DockError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::AppNotFound(_) => "DOCK_APP_NOT_FOUND",
//!             Self::Busy => "DOCK_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = DockError::Busy;
//! assert_eq!(err.code(), "DOCK_BUSY");
//! assert!(err.is_recoverable());
//! ```

/// Unified error code interface.
///
/// # Recoverability
///
/// An error is recoverable if retrying the operation may succeed or the
/// caller can take corrective action — a wait-for timeout (the event may
/// still be emitted on a later wait) or a middleware timeout (the next
/// dispatch may be faster). Non-recoverable errors — a listener cap hit,
/// a dependency cycle — require a code or configuration change, and the
/// lifecycle manager's retry loop treats them as final.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// `UPPER_SNAKE_CASE`, prefixed with the owning layer, stable across
    /// versions (changing a published code is a breaking change).
    fn code(&self) -> &'static str;

    /// Returns whether retrying or corrective action may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows workspace conventions.
///
/// # Checks
///
/// 1. Code is non-empty
/// 2. Code starts with the expected prefix
/// 3. Code is `UPPER_SNAKE_CASE`
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// use in tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use holo_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "BUS_A",
///             Self::B => "BUS_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "BUS_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Permanent => "TEST_PERMANENT",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert!(!TestError::Permanent.is_recoverable());
    }

    #[test]
    fn assert_error_codes_all_variants() {
        assert_error_codes(&[TestError::Transient, TestError::Permanent], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&TestError::Transient, "WRONG_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("BUS_CAPACITY_EXCEEDED"));
        assert!(is_upper_snake_case("MW_TIMEOUT"));
        assert!(is_upper_snake_case("A_B_1"));

        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("bus_timeout"));
        assert!(!is_upper_snake_case("_BUS"));
        assert!(!is_upper_snake_case("BUS_"));
        assert!(!is_upper_snake_case("BUS__TIMEOUT"));
    }
}
