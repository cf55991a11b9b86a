//! Event types for the Holodesk shell.
//!
//! This crate defines the vocabulary the event core speaks: the
//! [`ShellEvent`] tagged union and the [`NamePattern`] matcher used for
//! bulk listener cleanup.
//!
//! # Event Model
//!
//! Shell subsystems announce state changes by name — `app:opened`,
//! `window:resize`, `theme:changed` — and each name carries a payload
//! whose shape is stable across all emissions. Rather than an untyped
//! name→blob map, known events are a closed tagged union so producers and
//! consumers agree on payload shape at compile time:
//!
//! ```
//! use holo_event::ShellEvent;
//!
//! let ev = ShellEvent::WindowResized {
//!     window_id: "win-42".into(),
//!     width: 1280,
//!     height: 720,
//! };
//! assert_eq!(ev.name(), "window:resize");
//! ```
//!
//! One escape hatch stays open for forward compatibility: the
//! [`ShellEvent::Custom`] variant carries an arbitrary name and an opaque
//! JSON payload, so plugins can publish events the core has never heard
//! of. The bus treats both identically — routing is by `name()` alone.
//!
//! # Name Patterns
//!
//! Event names are colon-separated segments. [`NamePattern`] matches them
//! with `*` wildcards (`window:*`, `*`), which is how namespace-scoped
//! callers bulk-remove listeners without tracking individual ids.

mod event;
mod pattern;

pub use event::ShellEvent;
pub use pattern::{NamePattern, PatternError, PatternSegment};
