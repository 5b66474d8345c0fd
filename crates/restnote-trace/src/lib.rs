//! # restnote trace
//!
//! The trace stream of a notebook session: every request, response and
//! resolved value is described by a [`LogEvent`] and handed to a [`Logger`].
//!
//! Loggers are renderers. They decide layout and styling, while the event
//! model stays format agnostic:
//!
//! - [`EventKind`] is a closed set; every renderer handles every kind.
//! - [`Payload`] covers text, bytes, XML documents, maps, JSON values and
//!   table rows. Renderers degrade structured payloads to readable text and
//!   never fail on a payload type.
//! - [`MuteState`] lets callers silence a logger for a scope. Every
//!   [`MuteGuard`] it hands out keeps the logger muted until dropped, so
//!   nested and overlapping suppression composes.
//!
//! Three renderers ship with the crate: [`TextLogger`] (plain text or ANSI
//! to any writer), [`TracingLogger`] (forwards to `tracing`) and
//! [`MemoryLogger`] (records events, used for golden comparisons).
//!
//! ```rust
//! use restnote_trace::{LogEvent, Logger, MemoryLogger};
//!
//! let logger = MemoryLogger::new();
//! logger.emit(LogEvent::comment("before"));
//! {
//!     let _quiet = logger.mute_state().suppress();
//!     logger.emit(LogEvent::comment("hidden"));
//! }
//! logger.emit(LogEvent::comment("after"));
//! assert_eq!(logger.descriptions(), vec!["before", "after"]);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod color;
mod error;
mod event;
mod logger;
mod memory;
mod mute;
pub mod table;
mod text;
mod tracing_logger;

pub use color::Color;
pub use error::{TraceError, TraceResult};
pub use event::{Description, EventKind, LogEvent, Payload};
pub use logger::Logger;
pub use memory::MemoryLogger;
pub use mute::{MuteGuard, MuteState};
pub use text::TextLogger;
pub use tracing_logger::TracingLogger;
