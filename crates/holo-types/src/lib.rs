//! Core types for the Holodesk shell.
//!
//! This crate provides the foundational identifier types and the unified
//! error-code interface for the Holodesk event core — the in-process
//! nervous system connecting the shell's UI subsystems (windows, dock,
//! notifications, theming) without direct coupling.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Core SDK Layer                          │
//! │  (stable, safe for subsystems to depend on)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  holo-types     : ID types, ErrorCode          ◄── HERE     │
//! │  holo-event     : ShellEvent union, name patterns           │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Core Layer                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  holo-bus        : listener registry, EventBus              │
//! │  holo-middleware : dispatch chain executor                  │
//! │  holo-lifecycle  : tracked records, retry, persistence      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Runtime Layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  holo-runtime   : ShellEngine (wiring, init/teardown)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! All identifiers are UUID-based:
//!
//! - **Globally unique without coordination**: listeners, middlewares and
//!   lifecycle records can be created from any task
//! - **Serialization**: first-class serde support, so lifecycle records
//!   round-trip through the persistence store
//!
//! # Example
//!
//! ```
//! use holo_types::{ListenerId, MiddlewareId, RecordId};
//!
//! let listener = ListenerId::new();
//! let middleware = MiddlewareId::new();
//! let record = RecordId::new();
//!
//! assert_ne!(listener.uuid(), middleware.uuid());
//! println!("tracking {record}");
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ListenerId, MiddlewareId, RecordId};
