//! # restnote
//!
//! Notebook-style scripting of REST+XML (Atom style) services.
//!
//! A notebook registers named instances, each with credentials, a namespace
//! table and an optional trace [`Logger`](restnote_trace::Logger), then
//! drives them through a [`Session`]: instrumented HTTP verbs, XPath
//! resolution and mutation, URL templates and Atom feed tables. Every step
//! is described on the trace stream without changing its result. A STOMP
//! [`Client`](restnote_stomp::Client) listens on broker destinations next to
//! the HTTP work (feature `stomp`, on by default).
//!
//! ## Crates
//!
//! | module | crate | contents |
//! |--------|-------|----------|
//! | [`xml`] | `restnote-xml` | documents and namespace-aware XPath |
//! | [`trace`] | `restnote-trace` | trace events, loggers, muting |
//! | [`session`] | `restnote-session` | registry, session, configuration |
//! | [`stomp`] | `restnote-stomp` | broker listener |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restnote::prelude::*;
//!
//! # async fn run() -> SessionResult<()> {
//! let _ = LoggingConfig::stderr("warn").init();
//!
//! let session = Session::new();
//! session.registry().register(
//!     "staging",
//!     Credentials::new("admin", "secret"),
//!     Namespaces::from_pairs([("atom", "http://www.w3.org/2005/Atom")]),
//!     Some(Arc::new(TextLogger::stdout())),
//! )?;
//!
//! session.title("staging", "Assets")?;
//! let feed = session
//!     .get("staging", "http://localhost:8080/assets", Some("application/atom+xml"), &Headers::new())
//!     .await?
//!     .xml()?;
//!
//! let fields = FieldMap::from([
//!     ("id".to_string(), FieldSpec::new("atom:id", "Id")),
//!     ("title".to_string(), FieldSpec::new("atom:title", "Title")),
//! ]);
//! session.feed_table_auto("staging", &feed, &fields, &["id", "title"])?;
//! # Ok(())
//! # }
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

pub mod logging;

pub use restnote_session as session;
#[cfg(feature = "stomp")]
#[cfg_attr(docsrs, doc(cfg(feature = "stomp")))]
pub use restnote_stomp as stomp;
pub use restnote_trace as trace;
pub use restnote_xml as xml;

pub use logging::{LogOutput, LoggingConfig, LoggingGuard};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The types a notebook needs.
pub mod prelude {
    pub use crate::logging::{LoggingConfig, LoggingGuard};

    pub use restnote_session::{
        Body, Credentials, FieldMap, FieldSpec, Headers, HttpResponse, NotebookConfig, Registry,
        Session, SessionError, SessionResult, SessionSetup, die, fill, require,
    };
    pub use restnote_trace::{
        Color, EventKind, LogEvent, Logger, MemoryLogger, MuteGuard, Payload, TextLogger,
        TracingLogger,
    };
    pub use restnote_xml::{Document, Item, Namespaces, NodeId, XPath, XmlError};

    #[cfg(feature = "stomp")]
    pub use restnote_stomp::{
        Binding, BoundCallback, Client, ConnectionState, Listener, ListenerEvent, Response,
        Scope, StompConnector, StompError,
    };
}
