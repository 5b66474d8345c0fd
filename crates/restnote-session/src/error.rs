//! Session error types.

use restnote_xml::XmlError;
use thiserror::Error;

use crate::config::ConfigError;

/// A specialized `Result` type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by session operations.
///
/// HTTP status codes are never errors here: a 404 or 500 response is
/// returned to the caller like any other.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    /// No instance is registered under the name.
    #[error("No instance registered as '{name}'")]
    NotFound {
        /// The name that was looked up
        name: String,
    },

    /// A path was evaluated against, or a mutation applied to, something
    /// that is not an element.
    #[error("{0} is not a valid XML element")]
    InvalidElement(String),

    /// Required data is missing.
    #[error("Missing required data: {0}")]
    Validation(String),

    /// The transport failed. Propagated unchanged.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A URL or URL template could not be parsed.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// XML parsing or XPath evaluation failed.
    #[error(transparent)]
    Xml(XmlError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<XmlError> for SessionError {
    fn from(err: XmlError) -> Self {
        match err {
            XmlError::InvalidContext(what) => Self::InvalidElement(what),
            other => Self::Xml(other),
        }
    }
}

/// Build the failure for a required value that is missing.
///
/// ```rust
/// use restnote_session::{die, SessionError};
///
/// let err = die("asset title");
/// assert!(matches!(err, SessionError::Validation(ref what) if what == "asset title"));
/// ```
pub fn die(message: impl Into<String>) -> SessionError {
    SessionError::Validation(message.into())
}

/// Unwrap `value`, failing with [`SessionError::Validation`] naming `what`.
pub fn require<T>(value: Option<T>, what: &str) -> SessionResult<T> {
    value.ok_or_else(|| die(what))
}
