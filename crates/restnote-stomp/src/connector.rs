//! The seam between the client and a broker connection.
//!
//! [`Client`](crate::Client) only talks to brokers through [`Connector`] and
//! [`BrokerLink`], so the reconnect and routing logic can be driven by a
//! scripted broker in tests.

use std::fmt;

use futures::future::BoxFuture;

use crate::error::StompResult;
use crate::response::Response;

/// Broker address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name
    pub host: String,
    /// Port
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Broker login.
#[derive(Clone, PartialEq, Eq)]
pub struct Login {
    /// User name
    pub user: String,
    /// Passcode
    pub passcode: String,
}

impl Login {
    /// Create a login.
    pub fn new(user: impl Into<String>, passcode: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            passcode: passcode.into(),
        }
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("user", &self.user)
            .field("passcode", &"<redacted>")
            .finish()
    }
}

/// Subscription acknowledgement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckMode {
    /// The broker considers a message acknowledged once sent
    #[default]
    Auto,
    /// Cumulative client acknowledgement
    Client,
    /// Per-message client acknowledgement
    ClientIndividual,
}

impl AckMode {
    /// Header value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Client => "client",
            Self::ClientIndividual => "client-individual",
        }
    }
}

/// Something that happened on an established link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A delivered message
    Message(Response),
    /// An ERROR frame
    Error(Response),
    /// Nothing was heard within the negotiated heart-beat window
    HeartbeatTimeout,
}

/// Opens broker links.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Connect and log in, waiting until the broker has accepted.
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        login: &'a Login,
    ) -> BoxFuture<'a, StompResult<Box<dyn BrokerLink>>>;
}

/// An established, logged-in broker connection.
pub trait BrokerLink: Send + fmt::Debug {
    /// Subscribe to `destination`.
    fn subscribe<'a>(&'a mut self, destination: &'a str, ack: AckMode)
    -> BoxFuture<'a, StompResult<()>>;

    /// Wait for the next event. `None` means the link is gone.
    ///
    /// Must be cancel safe: the client drops it when closing.
    fn next_event(&mut self) -> BoxFuture<'_, Option<BrokerEvent>>;

    /// Leave politely. Errors are ignored.
    fn disconnect(&mut self) -> BoxFuture<'_, ()>;
}
