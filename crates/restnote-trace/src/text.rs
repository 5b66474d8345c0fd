//! Plain-text renderer.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::color::Color;
use crate::error::{TraceError, TraceResult};
use crate::event::{Description, EventKind, LogEvent, Payload};
use crate::logger::Logger;
use crate::mute::MuteState;
use crate::table;

/// Renders the trace stream as text to any writer.
///
/// With ANSI enabled, kinds are coloured and [`colorize`](Logger::colorize)
/// paints values; otherwise the output is plain.
pub struct TextLogger<W: Write + Send> {
    out: Mutex<W>,
    ansi: bool,
    closed: AtomicBool,
    mute: MuteState,
}

impl<W: Write + Send> TextLogger<W> {
    /// Plain text to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            ansi: false,
            closed: AtomicBool::new(false),
            mute: MuteState::new(),
        }
    }

    /// Enable or disable ANSI colours.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Consume the logger and return the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn paint(&self, value: &str, color: Color) -> String {
        if self.ansi {
            color.paint(value)
        } else {
            value.to_string()
        }
    }

    fn format(&self, event: &LogEvent) -> String {
        let description = event.description_text();
        let description = description.trim();
        let payload = event.payload.as_ref();
        let mut text = String::new();

        match event.kind {
            EventKind::Comment => {
                text.push_str(&self.paint(&format!("# {description}"), Color::Gray));
                text.push('\n');
            }
            EventKind::Title => {
                text.push('\n');
                text.push_str(&self.paint(description, Color::Blue));
                text.push('\n');
                text.push_str(&"=".repeat(description.chars().count()));
                text.push('\n');
            }
            EventKind::Table => {
                let headings = match &event.description {
                    Some(Description::Headings(headings)) => headings.clone(),
                    Some(Description::Text(text)) => vec![text.clone()],
                    None => Vec::new(),
                };
                let rows = match payload {
                    Some(Payload::Rows(rows)) => rows.clone(),
                    Some(other) => vec![vec![other.to_text()]],
                    None => Vec::new(),
                };
                text.push_str(&table::render(&headings, &rows));
            }
            EventKind::Error
            | EventKind::Warning
            | EventKind::Debug
            | EventKind::Info
            | EventKind::Ok
            | EventKind::Plain => {
                let (label, color) = match event.kind {
                    EventKind::Error => (Some("ERROR"), Some(Color::Red)),
                    EventKind::Warning => (Some("WARNING"), Some(Color::Yellow)),
                    EventKind::Debug => (Some("DEBUG"), Some(Color::Gray)),
                    EventKind::Ok => (Some("OK"), Some(Color::Green)),
                    _ => (None, None),
                };
                let line = match label {
                    Some(label) if description.is_empty() => label.to_string(),
                    Some(label) => format!("{label}: {description}"),
                    None => description.to_string(),
                };
                if !line.is_empty() {
                    text.push_str(&match color {
                        Some(color) => self.paint(&line, color),
                        None => line,
                    });
                    text.push('\n');
                }
                if let Some(payload) = payload {
                    push_block(&mut text, &payload.to_text());
                }
            }
            EventKind::Xml => {
                if !description.is_empty() {
                    text.push_str(description);
                    text.push('\n');
                }
                if let Some(payload) = payload {
                    push_block(&mut text, &payload.to_text());
                }
            }
            EventKind::Pretty => {
                if !description.is_empty() {
                    text.push_str(&self.paint(description, Color::Blue));
                    text.push('\n');
                }
                if let Some(payload) = payload {
                    push_block(&mut text, &payload.to_pretty());
                }
            }
        }
        text
    }
}

fn push_block(text: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    text.push_str(block);
    if !block.ends_with('\n') {
        text.push('\n');
    }
}

impl TextLogger<BufWriter<File>> {
    /// Plain text to a newly created (truncated) file.
    pub fn create(path: impl AsRef<Path>) -> TraceResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TraceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Writing trace to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl TextLogger<io::Stdout> {
    /// Text to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Logger for TextLogger<W> {
    fn mute_state(&self) -> &MuteState {
        &self.mute
    }

    fn render(&self, event: &LogEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let text = self.format(event);
        if let Err(e) = self.out.lock().write_all(text.as_bytes()) {
            warn!("Failed to write {} event: {}", event.kind, e);
        }
    }

    fn colorize(&self, value: &str, color: Color) -> String {
        self.paint(value, color)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.out.lock().flush() {
            warn!("Failed to flush trace output: {}", e);
        }
    }
}

impl<W: Write + Send> fmt::Debug for TextLogger<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLogger")
            .field("ansi", &self.ansi)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .field("mute", &self.mute)
            .finish_non_exhaustive()
    }
}
