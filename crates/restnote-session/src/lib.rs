//! # restnote session
//!
//! Named, instrumented sessions against REST+XML (Atom style) services.
//!
//! A [`Registry`] holds [`Instance`]s by name. Each instance carries its own
//! credentials, namespace table, HTTP client and optional
//! [`Logger`](restnote_trace::Logger). A [`Session`] is the handle scripts use:
//! every operation takes the instance name, looks it up, does its work and
//! describes it on the trace stream without changing what it returns.
//!
//! - HTTP verbs: [`Session::get`], [`Session::put`], [`Session::post`],
//!   [`Session::delete`]
//! - Paths: [`Session::resolve`], [`Session::resolve_all`] and the mutators
//!   [`Session::set_text`], [`Session::set_attribute`],
//!   [`Session::add_element`]
//! - Templates: [`Session::substitute`] and [`fill`]
//! - Atom tables: [`Session::feed_table`]
//! - Configuration: [`NotebookConfig`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restnote_session::{Credentials, Headers, Session};
//! use restnote_trace::TextLogger;
//! use restnote_xml::Namespaces;
//!
//! # async fn run() -> restnote_session::SessionResult<()> {
//! let session = Session::new();
//! session.registry().register(
//!     "staging",
//!     Credentials::new("admin", "secret"),
//!     Namespaces::from_pairs([("atom", "http://www.w3.org/2005/Atom")]),
//!     Some(Arc::new(TextLogger::stdout())),
//! )?;
//!
//! let response = session
//!     .get("staging", "http://localhost:8080/assets", Some("application/atom+xml"), &Headers::new())
//!     .await?;
//! let feed = response.xml()?;
//! let first = session.resolve_text("staging", &feed, feed.document_node(), "/atom:feed/atom:entry/atom:id")?;
//! # let _ = first;
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

pub mod atom;
pub mod config;
mod error;
mod http;
mod registry;
mod resolve;
mod session;
mod template;

pub use atom::{FieldMap, FieldSpec};
pub use config::{ConfigError, InstanceConfig, NotebookConfig};
pub use error::{SessionError, SessionResult, die, require};
pub use http::{Body, Headers, HttpResponse};
pub use registry::{Credentials, Instance, Registry};
pub use session::{Session, SessionSetup};
pub use template::fill;
