//! Bridge from the trace stream to `tracing`.

use tracing::{debug, error, info, warn};

use crate::event::{EventKind, LogEvent, Payload};
use crate::logger::Logger;
use crate::mute::MuteState;

/// Forwards trace events to `tracing` under the `restnote::trace` target.
///
/// Errors go out at ERROR, warnings at WARN, debug events at DEBUG and
/// everything else at INFO.
#[derive(Debug, Default)]
pub struct TracingLogger {
    mute: MuteState,
}

impl TracingLogger {
    /// Create a forwarding logger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for TracingLogger {
    fn mute_state(&self) -> &MuteState {
        &self.mute
    }

    fn render(&self, event: &LogEvent) {
        let kind = event.kind.as_str();
        let description = event.description_text();
        let payload = match (&event.payload, event.kind) {
            (Some(Payload::Rows(rows)), EventKind::Table) => format!("{} rows", rows.len()),
            (Some(payload), EventKind::Pretty) => payload.to_pretty(),
            (Some(payload), _) => payload.to_text(),
            (None, _) => String::new(),
        };

        match event.kind {
            EventKind::Error => error!(target: "restnote::trace", kind, payload = %payload, "{}", description),
            EventKind::Warning => warn!(target: "restnote::trace", kind, payload = %payload, "{}", description),
            EventKind::Debug => debug!(target: "restnote::trace", kind, payload = %payload, "{}", description),
            _ => info!(target: "restnote::trace", kind, payload = %payload, "{}", description),
        }
    }
}
