//! Trace events.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use restnote_xml::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an event describes. Renderers dispatch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Free-form commentary
    Comment,
    /// Section heading
    Title,
    /// Table; description holds headings and payload holds rows
    Table,
    /// Error
    Error,
    /// Warning
    Warning,
    /// Debug output
    Debug,
    /// Informational output
    Info,
    /// Success
    Ok,
    /// XML payload
    Xml,
    /// Structured payload to pretty-print
    Pretty,
    /// Untyped
    Plain,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Comment,
        Self::Title,
        Self::Table,
        Self::Error,
        Self::Warning,
        Self::Debug,
        Self::Info,
        Self::Ok,
        Self::Xml,
        Self::Pretty,
        Self::Plain,
    ];

    /// Lowercase kind name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Title => "title",
            Self::Table => "table",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Ok => "ok",
            Self::Xml => "xml",
            Self::Pretty => "pretty",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The description of an event: a line of text, or table headings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    /// A line of text
    Text(String),
    /// Column headings of a table event
    Headings(Vec<String>),
}

impl Description {
    /// The description as a single line.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Headings(headings) => headings.join("  "),
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for Description {
    fn from(headings: Vec<String>) -> Self {
        Self::Headings(headings)
    }
}

/// The data carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text
    Text(String),
    /// Raw bytes, rendered lossily as UTF-8
    Bytes(Bytes),
    /// An XML document, rendered in its wire form
    Xml(Document),
    /// String mapping such as HTTP headers
    Map(BTreeMap<String, String>),
    /// Arbitrary structured value
    Value(Value),
    /// Table rows of already stringified cells
    Rows(Vec<Vec<String>>),
}

impl Payload {
    /// Readable single-block text. Never fails.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Xml(doc) => doc.to_xml_string(),
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Value(Value::String(s)) => s.clone(),
            Self::Value(value) => value.to_string(),
            Self::Rows(rows) => rows
                .iter()
                .map(|row| row.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Pretty-printed text. Structured payloads become indented JSON.
    pub fn to_pretty(&self) -> String {
        let value = match self {
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Self::Rows(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Array(row.iter().cloned().map(Value::String).collect()))
                    .collect(),
            ),
            Self::Value(value) => value.clone(),
            other => return other.to_text(),
        };
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Document> for Payload {
    fn from(doc: Document) -> Self {
        Self::Xml(doc)
    }
}

impl From<BTreeMap<String, String>> for Payload {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self::Map(map)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<Vec<String>>> for Payload {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::Rows(rows)
    }
}

/// One `(description, payload, kind)` entry of the trace stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Optional description or table headings
    pub description: Option<Description>,
    /// Optional payload
    pub payload: Option<Payload>,
    /// Event kind
    pub kind: EventKind,
}

impl LogEvent {
    /// An empty event of `kind`.
    pub fn new(kind: EventKind) -> Self {
        Self {
            description: None,
            payload: None,
            kind,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<Description>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// A comment.
    pub fn comment(text: impl Into<String>) -> Self {
        Self::new(EventKind::Comment).with_description(text.into())
    }

    /// A title.
    pub fn title(text: impl Into<String>) -> Self {
        Self::new(EventKind::Title).with_description(text.into())
    }

    /// A success line.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::new(EventKind::Ok).with_description(text.into())
    }

    /// An error line.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(EventKind::Error).with_description(text.into())
    }

    /// A warning line.
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(EventKind::Warning).with_description(text.into())
    }

    /// An informational line.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(EventKind::Info).with_description(text.into())
    }

    /// A debug line.
    pub fn debug(text: impl Into<String>) -> Self {
        Self::new(EventKind::Debug).with_description(text.into())
    }

    /// A table. Headings and rows are independent in length.
    pub fn table(headings: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self::new(EventKind::Table)
            .with_description(Description::Headings(headings))
            .with_payload(Payload::Rows(rows))
    }

    /// An XML payload, optionally described.
    pub fn xml(description: Option<String>, payload: impl Into<Payload>) -> Self {
        Self {
            description: description.map(Description::Text),
            payload: Some(payload.into()),
            kind: EventKind::Xml,
        }
    }

    /// A structured payload to pretty-print.
    pub fn pretty(description: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self::new(EventKind::Pretty)
            .with_description(description.into())
            .with_payload(payload)
    }

    /// An untyped payload, optionally described.
    pub fn plain(description: Option<String>, payload: impl Into<Payload>) -> Self {
        Self {
            description: description.map(Description::Text),
            payload: Some(payload.into()),
            kind: EventKind::Plain,
        }
    }

    /// Description as a single line, empty when absent.
    pub fn description_text(&self) -> String {
        self.description
            .as_ref()
            .map(Description::as_text)
            .unwrap_or_default()
    }
}
