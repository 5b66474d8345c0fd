//! The Logger contract.

use std::fmt;

use tracing::warn;

use crate::color::Color;
use crate::event::LogEvent;
use crate::mute::MuteState;

/// A renderer of the trace stream.
///
/// Implementors provide [`render`](Logger::render) and expose their
/// [`MuteState`]; callers use [`emit`](Logger::emit), which applies mute and
/// selective mute before anything else. Rendering must not fail for any
/// payload: I/O problems are reported through `tracing` and swallowed so
/// that instrumentation never changes what the caller gets back.
pub trait Logger: Send + Sync + fmt::Debug {
    /// The suppression state of this logger.
    fn mute_state(&self) -> &MuteState;

    /// Render an event that passed suppression.
    fn render(&self, event: &LogEvent);

    /// Deliver an event unless it is suppressed.
    fn emit(&self, event: LogEvent) {
        if self.mute_state().suppresses(event.kind) {
            return;
        }
        self.render(&event);
    }

    /// Annotate `value` with `color`. Pure; the default leaves it unchanged.
    fn colorize(&self, value: &str, color: Color) -> String {
        let _ = color;
        value.to_string()
    }

    /// Annotate `value` with a colour given by name.
    ///
    /// Unknown names leave the value unchanged and produce a diagnostic.
    fn colorize_named(&self, value: &str, color: &str) -> String {
        match color.parse::<Color>() {
            Ok(color) => self.colorize(value, color),
            Err(e) => {
                warn!(color = %color, "{}", e);
                value.to_string()
            }
        }
    }

    /// Whether this renderer produces markup (tables with styled cells).
    fn is_graphical(&self) -> bool {
        false
    }

    /// Flush and finalize. Calling it again has no effect.
    fn close(&self) {}
}
