//! STOMP 1.2 frames.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::StompError;

/// Frame commands of STOMP 1.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    /// Client connect
    Connect,
    /// Client connect (1.2 spelling)
    Stomp,
    /// Server accepted the connection
    Connected,
    /// Client publish
    Send,
    /// Client subscribe
    Subscribe,
    /// Client unsubscribe
    Unsubscribe,
    /// Client acknowledge
    Ack,
    /// Client negative acknowledge
    Nack,
    /// Client disconnect
    Disconnect,
    /// Server delivered message
    Message,
    /// Server receipt
    Receipt,
    /// Server error
    Error,
}

impl Command {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED headers are sent without escaping.
    pub(crate) const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => return Err(StompError::Protocol(format!("unknown command '{other}'"))),
        })
    }
}

/// A single frame: command, ordered headers and body.
///
/// Headers keep wire order. When a header repeats, the first value is the
/// one that counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command
    pub command: Command,
    /// Headers in wire order
    pub headers: Vec<(String, String)>,
    /// Frame body
    pub body: Bytes,
}

impl Frame {
    /// Create a frame without headers or body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Something read from or written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompItem {
    /// A complete frame
    Frame(Frame),
    /// A heart-beat (a bare end-of-line)
    Heartbeat,
}

impl From<Frame> for StompItem {
    fn from(frame: Frame) -> Self {
        Self::Frame(frame)
    }
}

/// Negotiated heart-beat periods in milliseconds, `0` meaning none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    /// Smallest interval at which the sender can send heart-beats
    pub send: u64,
    /// Desired interval at which the sender wants to receive heart-beats
    pub receive: u64,
}

impl HeartBeat {
    /// Create a heart-beat pair.
    pub const fn new(send: u64, receive: u64) -> Self {
        Self { send, receive }
    }

    /// Parse a `heart-beat` header value such as `"10000,10000"`.
    pub fn parse(value: &str) -> Result<Self, StompError> {
        let invalid = || StompError::Protocol(format!("invalid heart-beat header '{value}'"));
        let (send, receive) = value.split_once(',').ok_or_else(invalid)?;
        Ok(Self {
            send: send.trim().parse().map_err(|_| invalid())?,
            receive: receive.trim().parse().map_err(|_| invalid())?,
        })
    }

    /// Header value.
    pub fn to_header(self) -> String {
        format!("{},{}", self.send, self.receive)
    }

    /// Negotiate with the broker's answer.
    ///
    /// Returns `(outgoing, incoming)` periods: how often this side must send
    /// and how often it should expect to hear from the broker.
    pub fn negotiate(self, server: Self) -> (u64, u64) {
        let outgoing = if self.send == 0 || server.receive == 0 {
            0
        } else {
            self.send.max(server.receive)
        };
        let incoming = if self.receive == 0 || server.send == 0 {
            0
        } else {
            self.receive.max(server.send)
        };
        (outgoing, incoming)
    }
}

pub(crate) fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn unescape_header(value: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(other) => {
                return Err(StompError::Protocol(format!(
                    "undefined escape sequence '\\{other}'"
                )));
            }
            None => return Err(StompError::Protocol("dangling escape".to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_header_wins() {
        let frame = Frame::new(Command::Message)
            .header("destination", "/queue/a")
            .header("destination", "/queue/b");
        assert_eq!(frame.get("destination"), Some("/queue/a"));
        assert_eq!(frame.get("missing"), None);
    }

    #[test]
    fn test_command_names() {
        for command in [Command::Connected, Command::Message, Command::Error] {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), command);
        }
        assert!("PUBLISH".parse::<Command>().is_err());
        assert!(!Command::Connect.escapes_headers());
        assert!(Command::Message.escapes_headers());
    }

    #[test]
    fn test_escaping() {
        let raw = "a:b\\c\nd\re";
        let escaped = escape_header(raw);
        assert_eq!(escaped, "a\\cb\\\\c\\nd\\re");
        assert_eq!(unescape_header(&escaped).unwrap(), raw);
        assert!(unescape_header("bad\\t").is_err());
        assert!(unescape_header("bad\\").is_err());
    }

    #[test]
    fn test_heartbeat_negotiation() {
        let client = HeartBeat::new(4000, 10000);
        assert_eq!(client.negotiate(HeartBeat::new(5000, 2000)), (4000, 10000));
        assert_eq!(client.negotiate(HeartBeat::new(20000, 0)), (0, 20000));
        assert_eq!(HeartBeat::default().negotiate(HeartBeat::new(1, 1)), (0, 0));
        assert_eq!(HeartBeat::parse(" 100, 200").unwrap(), HeartBeat::new(100, 200));
        assert!(HeartBeat::parse("100").is_err());
        assert_eq!(client.to_header(), "4000,10000");
    }
}
