//! STOMP error types.

use thiserror::Error;

/// A specialized `Result` type for broker operations.
pub type StompResult<T> = std::result::Result<T, StompError>;

/// Errors raised while establishing a subscription.
///
/// Once [`Client::listen`](crate::Client::listen) has returned, broker
/// problems are routed to the listener instead of being raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StompError {
    /// The subscription URL could not be parsed.
    #[error("Invalid subscription URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// What is wrong with it
        reason: String,
    },

    /// Failed to establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker answered CONNECT with an ERROR frame.
    #[error("Broker rejected the connection: {message}")]
    Rejected {
        /// The broker's message
        message: String,
    },

    /// An established connection was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A frame violated the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A frame exceeded the configured size limit.
    #[error("Frame of at least {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Bytes buffered so far
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

impl From<std::io::Error> for StompError {
    fn from(err: std::io::Error) -> Self {
        Self::ConnectionLost(err.to_string())
    }
}
