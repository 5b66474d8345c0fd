//! In-memory recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::color::Color;
use crate::event::{EventKind, LogEvent};
use crate::logger::Logger;
use crate::mute::MuteState;

/// Records every delivered event, in order.
///
/// A graphical recorder wraps coloured values as `<color>value</color>`,
/// standing in for markup renderers.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    events: Mutex<Vec<LogEvent>>,
    graphical: bool,
    closed: AtomicBool,
    mute: MuteState,
}

impl MemoryLogger {
    /// A non-graphical recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A graphical recorder.
    pub fn graphical() -> Self {
        Self {
            graphical: true,
            ..Self::default()
        }
    }

    /// Copy of the recorded events.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    /// Remove and return the recorded events.
    pub fn take(&self) -> Vec<LogEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Kinds of the recorded events.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    /// Descriptions of the recorded events as text.
    pub fn descriptions(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(LogEvent::description_text)
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Whether [`close`](Logger::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Logger for MemoryLogger {
    fn mute_state(&self) -> &MuteState {
        &self.mute
    }

    fn render(&self, event: &LogEvent) {
        self.events.lock().push(event.clone());
    }

    fn colorize(&self, value: &str, color: Color) -> String {
        if self.graphical {
            format!("<{color}>{value}</{color}>")
        } else {
            value.to_string()
        }
    }

    fn is_graphical(&self) -> bool {
        self.graphical
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
