//! Normalized broker responses.

use std::collections::BTreeMap;

use bytes::Bytes;
use restnote_trace::{LogEvent, Logger};

use crate::frame::Frame;

/// Status given to delivered messages.
pub const STATUS_OK: u16 = 200;

/// Status given to broker errors.
pub const STATUS_ERROR: u16 = 500;

/// A broker message or error, shaped like an HTTP response so both can be
/// handled and traced the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Frame headers. A repeated header keeps its first value.
    pub headers: BTreeMap<String, String>,
    /// Frame body
    pub content: Bytes,
    /// [`STATUS_OK`] for messages, [`STATUS_ERROR`] for errors
    pub status_code: u16,
}

impl Response {
    /// Create a response.
    pub fn new(headers: BTreeMap<String, String>, content: impl Into<Bytes>, status_code: u16) -> Self {
        Self {
            headers,
            content: content.into(),
            status_code,
        }
    }

    /// A delivered MESSAGE frame.
    pub fn message(frame: Frame) -> Self {
        Self::from_frame(frame, STATUS_OK)
    }

    /// A broker ERROR frame.
    pub fn error(frame: Frame) -> Self {
        Self::from_frame(frame, STATUS_ERROR)
    }

    fn from_frame(frame: Frame, status_code: u16) -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in frame.headers {
            headers.entry(name).or_insert(value);
        }
        Self {
            headers,
            content: frame.body,
            status_code,
        }
    }

    /// Whether this is a delivered message.
    pub fn is_ok(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Body decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Describe this response on a trace stream, the way HTTP responses
    /// are described: headers pretty-printed, then the body as XML when
    /// the content type mentions `xml`.
    pub fn trace(&self, logger: &dyn Logger, label: &str) {
        logger.emit(LogEvent::pretty(
            format!("{label} <<< [{}]", self.status_code),
            self.headers.clone(),
        ));
        let is_xml = self
            .header("content-type")
            .is_some_and(|content_type| content_type.contains("xml"));
        if is_xml {
            logger.emit(LogEvent::xml(None, self.content.clone()));
        } else {
            logger.emit(LogEvent::plain(None, self.content.clone()));
        }
    }
}
