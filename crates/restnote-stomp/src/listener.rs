//! Event routing to bound callbacks.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use tracing::trace;

use crate::callback::{Binding, BoundCallback};
use crate::error::StompError;

/// Connection events a listener can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerEvent {
    /// A message was delivered (payload: [`Response`](crate::Response), 200)
    Message,
    /// The broker sent an error (payload: [`Response`](crate::Response), 500)
    Error,
    /// A connection attempt is starting (payload: `"host:port"`)
    Connecting,
    /// The connection was lost (no payload)
    Disconnected,
    /// The broker stopped sending heart-beats (no payload)
    HeartbeatTimeout,
}

impl ListenerEvent {
    /// All events.
    pub const ALL: [Self; 5] = [
        Self::Message,
        Self::Error,
        Self::Connecting,
        Self::Disconnected,
        Self::HeartbeatTimeout,
    ];

    /// Event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Error => "error",
            Self::Connecting => "connecting",
            Self::Disconnected => "disconnected",
            Self::HeartbeatTimeout => "heartbeat_timeout",
        }
    }
}

impl fmt::Display for ListenerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListenerEvent {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "error" => Ok(Self::Error),
            "connecting" => Ok(Self::Connecting),
            "disconnected" => Ok(Self::Disconnected),
            "heartbeat_timeout" | "heartbeat_time_out" => Ok(Self::HeartbeatTimeout),
            other => Err(StompError::Protocol(format!("unknown listener event '{other}'"))),
        }
    }
}

/// Routes connection events to at most one callback each.
#[derive(Default)]
pub struct Listener {
    routes: RwLock<HashMap<ListenerEvent, BoundCallback>>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.routes.read().keys().copied().collect();
        events.sort();
        f.debug_struct("Listener").field("routes", &events).finish()
    }
}

impl Listener {
    /// A listener with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `event` to `callback`. A later registration for the same
    /// event replaces the earlier one.
    pub fn register(&self, event: ListenerEvent, callback: BoundCallback) -> &Self {
        self.routes.write().insert(event, callback);
        self
    }

    /// Register by builder.
    #[must_use]
    pub fn on(self, event: ListenerEvent, callback: BoundCallback) -> Self {
        self.register(event, callback);
        self
    }

    /// Whether `event` has a callback.
    pub fn is_registered(&self, event: ListenerEvent) -> bool {
        self.routes.read().contains_key(&event)
    }

    /// Invoke the callback for `event`, if any. Unrouted events are ignored.
    pub fn route(&self, event: ListenerEvent, payload: impl Into<Binding>) {
        // Clone out so a callback may register routes without deadlocking.
        let callback = self.routes.read().get(&event).cloned();
        match callback {
            Some(callback) => callback.invoke(payload),
            None => trace!("No route for {} event", event),
        }
    }
}
