//! # restnote stomp
//!
//! Listen on STOMP broker destinations from a notebook.
//!
//! A [`Client`] opens one connection per subscription URL
//! (`stomp://host:port/?destination=/queue/name`), subscribes with automatic
//! acknowledgement and routes what happens on it to a [`Listener`]:
//!
//! | event | payload |
//! |-------|---------|
//! | [`ListenerEvent::Message`] | [`Response`] with status 200 |
//! | [`ListenerEvent::Error`] | [`Response`] with status 500 |
//! | [`ListenerEvent::Connecting`] | `"host:port"` |
//! | [`ListenerEvent::Disconnected`] | nothing |
//! | [`ListenerEvent::HeartbeatTimeout`] | nothing |
//!
//! Callbacks are [`BoundCallback`]s: a handler, the variables it captured
//! and the name the payload is bound to.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restnote_stomp::{BoundCallback, Client, Listener, ListenerEvent};
//!
//! # async fn run() -> restnote_stomp::StompResult<()> {
//! let listener = Listener::new().on(
//!     ListenerEvent::Message,
//!     BoundCallback::new("msg", |scope| {
//!         if let Some(msg) = scope.response("msg") {
//!             println!("{}", msg.text());
//!         }
//!     }),
//! );
//!
//! let client = Client::new("guest", "guest");
//! client
//!     .listen("stomp://localhost:61613/?destination=/queue/assets", Arc::new(listener), true)
//!     .await?;
//! // ...
//! client.close("stomp://localhost:61613/?destination=/queue/assets").await;
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

pub mod callback;
mod client;
pub mod codec;
mod connector;
mod error;
pub mod frame;
mod listener;
mod response;
mod tcp;

pub use callback::{Binding, BoundCallback, Scope};
pub use client::{Client, ConnectionState, DEFAULT_PORT, Subscription};
pub use codec::StompCodec;
pub use connector::{AckMode, BrokerEvent, BrokerLink, Connector, Endpoint, Login};
pub use error::{StompError, StompResult};
pub use frame::{Command, Frame, HeartBeat, StompItem};
pub use listener::{Listener, ListenerEvent};
pub use response::{Response, STATUS_ERROR, STATUS_OK};
pub use tcp::{DEFAULT_HEARTBEAT, StompConnector, StompLink};
