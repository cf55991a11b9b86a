//! The shell event union.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An event flowing through the shell's bus.
///
/// Known events are closed variants with typed payloads; the payload
/// shape for a given name is therefore stable across all emissions by
/// construction. [`Custom`](Self::Custom) carries an opaque JSON payload
/// for extension points the core does not know about.
///
/// Routing is by [`name()`](Self::name): listeners subscribe to the
/// string key, never to the variant, so a `Custom` event named
/// `"window:resize"` reaches the same listeners as the typed variant.
///
/// # Example
///
/// ```
/// use holo_event::ShellEvent;
/// use serde_json::json;
///
/// let typed = ShellEvent::AppOpened { app_id: "files".into() };
/// assert_eq!(typed.name(), "app:opened");
///
/// let custom = ShellEvent::custom("plugin:sync", json!({"state": "done"}));
/// assert_eq!(custom.name(), "plugin:sync");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShellEvent {
    /// An application was launched.
    AppOpened {
        /// Registry id of the application.
        app_id: String,
    },

    /// An application was closed.
    AppClosed {
        /// Registry id of the application.
        app_id: String,
    },

    /// A window gained focus.
    WindowFocused {
        /// Window identifier.
        window_id: String,
    },

    /// A window was resized to new dimensions.
    WindowResized {
        /// Window identifier.
        window_id: String,
        /// New width in CSS pixels.
        width: u32,
        /// New height in CSS pixels.
        height: u32,
    },

    /// A window was closed.
    WindowClosed {
        /// Window identifier.
        window_id: String,
    },

    /// The active theme changed.
    ThemeChanged {
        /// Theme identifier (e.g., "dark", "light").
        theme: String,
    },

    /// A notification was posted to the notification center.
    NotificationPosted {
        /// Short title line.
        title: String,
        /// Body text.
        body: String,
    },

    /// An application was pinned to the dock.
    DockPinned {
        /// Registry id of the application.
        app_id: String,
    },

    /// Extension event with an arbitrary name and opaque payload.
    ///
    /// The payload contract for a custom name is owned by whoever mints
    /// the name; the core does not validate shape at runtime.
    Custom {
        /// Event name (colon-separated segments by convention).
        name: String,
        /// Opaque payload.
        payload: Value,
    },
}

impl ShellEvent {
    /// Creates a custom event.
    #[must_use]
    pub fn custom(name: impl Into<String>, payload: Value) -> Self {
        Self::Custom {
            name: name.into(),
            payload,
        }
    }

    /// Returns the event name used as the routing key.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::AppOpened { .. } => "app:opened",
            Self::AppClosed { .. } => "app:closed",
            Self::WindowFocused { .. } => "window:focus",
            Self::WindowResized { .. } => "window:resize",
            Self::WindowClosed { .. } => "window:close",
            Self::ThemeChanged { .. } => "theme:changed",
            Self::NotificationPosted { .. } => "notification:posted",
            Self::DockPinned { .. } => "dock:pinned",
            Self::Custom { name, .. } => name,
        }
    }

    /// Returns `true` if this is a [`Custom`](Self::Custom) event.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    /// Returns the payload as a JSON value.
    ///
    /// For typed variants this is an object of the variant's fields; for
    /// `Custom` it is the carried payload itself. Used by the middleware
    /// layer, which inspects payloads generically.
    #[must_use]
    pub fn payload_json(&self) -> Value {
        match self {
            Self::AppOpened { app_id } | Self::AppClosed { app_id } | Self::DockPinned { app_id } => {
                json!({ "app_id": app_id })
            }
            Self::WindowFocused { window_id } | Self::WindowClosed { window_id } => {
                json!({ "window_id": window_id })
            }
            Self::WindowResized {
                window_id,
                width,
                height,
            } => json!({ "window_id": window_id, "width": width, "height": height }),
            Self::ThemeChanged { theme } => json!({ "theme": theme }),
            Self::NotificationPosted { title, body } => {
                json!({ "title": title, "body": body })
            }
            Self::Custom { payload, .. } => payload.clone(),
        }
    }

    /// Reconstructs an event from a persisted `(name, value)` pair.
    ///
    /// `value` is expected to be the serde form of a [`ShellEvent`] (as
    /// written by `serde_json::to_value`). Values that do not parse as a
    /// known variant fall back to `Custom { name, payload: value }`, so
    /// tracked units of work that are not shell events replay unchanged.
    #[must_use]
    pub fn from_parts(name: &str, value: Value) -> Self {
        match serde_json::from_value::<ShellEvent>(value.clone()) {
            Ok(event) if event.name() == name => event,
            _ => Self::Custom {
                name: name.to_string(),
                payload: value,
            },
        }
    }
}

impl std::fmt::Display for ShellEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
