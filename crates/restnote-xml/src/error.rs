//! XML error types.

use thiserror::Error;

/// A specialized `Result` type for XML operations.
pub type XmlResult<T> = std::result::Result<T, XmlError>;

/// Errors raised while parsing, querying or mutating documents.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// The input contained no root element.
    #[error("XML document has no root element")]
    NoRootElement,

    /// An XPath expression could not be parsed.
    #[error("Invalid XPath expression '{expression}': {message}")]
    XPathSyntax {
        /// The offending expression
        expression: String,
        /// What went wrong
        message: String,
    },

    /// An XPath expression used a prefix that is not in the namespace table.
    #[error("Undefined namespace prefix '{0}'")]
    UnknownPrefix(String),

    /// An XPath function that is not supported was called.
    #[error("Unknown XPath function '{0}'")]
    UnknownFunction(String),

    /// A query or mutation was applied to something that is not an element.
    #[error("{0} is not a valid XML element")]
    InvalidContext(String),
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Parse(err.to_string())
    }
}
