//! Trace error types.

use thiserror::Error;

/// A specialized `Result` type for trace operations.
pub type TraceResult<T> = std::result::Result<T, TraceError>;

/// Errors raised while setting up a renderer.
///
/// Emitting events never fails; only opening an output can.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// The output could not be opened.
    #[error("Failed to open trace output '{path}': {source}")]
    Open {
        /// Path of the output
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A colour name is not one of the supported colours.
    #[error("Unknown colour '{0}'")]
    UnknownColor(String),
}
