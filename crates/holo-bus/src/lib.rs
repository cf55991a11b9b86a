//! Event bus for the Holodesk shell.
//!
//! [`EventBus`] is the shared broadcast medium connecting the shell's
//! subsystems. Listeners subscribe to event names with a priority, an
//! optional `once` flag and an optional namespace tag; emission fans out
//! synchronously in descending-priority order over a snapshot of the
//! listener list.
//!
//! # Architecture
//!
//! ```text
//! Publishers (many):                    Listeners (per event name):
//!   window manager ──┐
//!   dock           ──┼──► EventBus ──► [prio 10] [prio 5] [prio 0] …
//!   notifications  ──┤    (registry)     synchronous, in order
//!   theming        ──┘
//! ```
//!
//! # Rules
//!
//! - **Snapshot dispatch**: `emit` iterates a copy of the listener list,
//!   so handlers may subscribe/unsubscribe mid-dispatch without affecting
//!   the in-flight fan-out.
//! - **Failure containment**: a listener returning `Err` or panicking is
//!   logged and does not stop sibling listeners or the emit call.
//! - **Once listeners** are removed after their single invocation,
//!   success or failure.
//! - **Hard cap**: subscribing past the per-event listener cap fails with
//!   [`BusError::CapacityExceeded`]; the cap is a rejection, not a queue.
//! - **No cross-emit ordering**: ordering is guaranteed within a single
//!   `emit` only.
//!
//! # Example
//!
//! ```
//! use holo_bus::{EventBus, SubscribeOptions};
//! use holo_event::ShellEvent;
//!
//! let bus = EventBus::new(Default::default());
//! bus.subscribe(
//!     "theme:changed",
//!     |ev: &ShellEvent| {
//!         println!("now rendering {}", ev.payload_json()["theme"]);
//!         Ok(())
//!     },
//!     SubscribeOptions::default(),
//! )
//! .unwrap();
//!
//! let delivered = bus.emit(&ShellEvent::ThemeChanged { theme: "dark".into() });
//! assert_eq!(delivered, 1);
//! ```

mod bus;
mod config;
mod error;
mod listener;
mod registry;

pub use bus::{BusStats, EventBus};
pub use config::BusConfig;
pub use error::{BusError, ListenerError};
pub use listener::{EventListener, ListenerFilter, SubscribeOptions};
