//! Wire codec for STOMP frames.
//!
//! Used with [`tokio_util::codec::Framed`] the same way a line codec would
//! be: the decoder yields [`StompItem`]s, the encoder accepts them.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::StompError;
use crate::frame::{Command, Frame, StompItem, escape_header, unescape_header};

/// Default upper bound for a buffered frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Frame codec.
#[derive(Debug, Clone)]
pub struct StompCodec {
    max_frame_size: usize,
}

impl Default for StompCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl StompCodec {
    /// Codec with the default size limit.
    pub const fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Codec with a custom size limit.
    pub const fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    fn too_large(&self, buf: &BytesMut) -> Result<(), StompError> {
        if buf.len() > self.max_frame_size {
            return Err(StompError::FrameTooLarge {
                size: buf.len(),
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}

/// Next line starting at `from`, without its EOL, plus the offset after it.
fn line_at(buf: &[u8], from: usize) -> Option<(&[u8], usize)> {
    let end = from + buf[from..].iter().position(|b| *b == b'\n')?;
    let line = &buf[from..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, end + 1))
}

fn utf8(bytes: &[u8]) -> Result<&str, StompError> {
    std::str::from_utf8(bytes).map_err(|_| StompError::Protocol("header is not UTF-8".to_string()))
}

impl Decoder for StompCodec {
    type Item = StompItem;
    type Error = StompError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<StompItem>, StompError> {
        // EOLs between frames are heart-beats.
        if buf.starts_with(b"\n") {
            buf.advance(1);
            return Ok(Some(StompItem::Heartbeat));
        }
        if buf.starts_with(b"\r\n") {
            buf.advance(2);
            return Ok(Some(StompItem::Heartbeat));
        }
        if buf.is_empty() || buf[..] == b"\r"[..] {
            return Ok(None);
        }

        let Some((command, mut pos)) = line_at(buf, 0) else {
            self.too_large(buf)?;
            return Ok(None);
        };
        let command: Command = utf8(command)?.parse()?;

        let mut headers = Vec::new();
        loop {
            let Some((line, next)) = line_at(buf, pos) else {
                self.too_large(buf)?;
                return Ok(None);
            };
            pos = next;
            if line.is_empty() {
                break;
            }
            let line = utf8(line)?;
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::Protocol(format!("malformed header '{line}'")))?;
            if command.escapes_headers() {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .map(|(_, value)| {
                value.trim().parse::<usize>().map_err(|_| {
                    StompError::Protocol(format!("invalid content-length '{value}'"))
                })
            })
            .transpose()?;

        let body_end = match content_length {
            Some(length) => {
                if length > self.max_frame_size {
                    return Err(StompError::FrameTooLarge {
                        size: length,
                        limit: self.max_frame_size,
                    });
                }
                if buf.len() < pos + length + 1 {
                    buf.reserve(pos + length + 1 - buf.len());
                    return Ok(None);
                }
                if buf[pos + length] != 0 {
                    return Err(StompError::Protocol(
                        "frame body not terminated by NUL".to_string(),
                    ));
                }
                pos + length
            }
            None => match buf[pos..].iter().position(|b| *b == 0) {
                Some(offset) => pos + offset,
                None => {
                    self.too_large(buf)?;
                    return Ok(None);
                }
            },
        };

        let mut frame_bytes = buf.split_to(body_end + 1);
        frame_bytes.truncate(body_end);
        let body = frame_bytes.split_off(pos).freeze();

        Ok(Some(StompItem::Frame(Frame {
            command,
            headers,
            body,
        })))
    }
}

impl Encoder<StompItem> for StompCodec {
    type Error = StompError;

    fn encode(&mut self, item: StompItem, dst: &mut BytesMut) -> Result<(), StompError> {
        let frame = match item {
            StompItem::Heartbeat => {
                dst.put_u8(b'\n');
                return Ok(());
            }
            StompItem::Frame(frame) => frame,
        };

        let escape = frame.command.escapes_headers();
        dst.put_slice(frame.command.as_str().as_bytes());
        dst.put_u8(b'\n');
        for (name, value) in &frame.headers {
            if escape {
                dst.put_slice(escape_header(name).as_bytes());
                dst.put_u8(b':');
                dst.put_slice(escape_header(value).as_bytes());
            } else {
                dst.put_slice(name.as_bytes());
                dst.put_u8(b':');
                dst.put_slice(value.as_bytes());
            }
            dst.put_u8(b'\n');
        }
        if !frame.body.is_empty() && frame.get("content-length").is_none() {
            dst.put_slice(format!("content-length:{}\n", frame.body.len()).as_bytes());
        }
        dst.put_u8(b'\n');
        dst.put_slice(&frame.body);
        dst.put_u8(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn decode_all(codec: &mut StompCodec, input: &[u8]) -> Vec<StompItem> {
        let mut buf = BytesMut::from(input);
        let mut items = Vec::new();
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_decode_message_without_content_length() {
        let mut codec = StompCodec::new();
        let items = decode_all(
            &mut codec,
            b"MESSAGE\ndestination:/queue/a\nmessage-id:7\n\nhello\0\n",
        );
        assert_eq!(items.len(), 2);
        let StompItem::Frame(frame) = &items[0] else {
            panic!("expected frame, got {:?}", items[0]);
        };
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.get("destination"), Some("/queue/a"));
        assert_eq!(frame.body, Bytes::from_static(b"hello"));
        assert_eq!(items[1], StompItem::Heartbeat);
    }

    #[test]
    fn test_content_length_allows_nul_in_body() {
        let mut codec = StompCodec::new();
        let items = decode_all(&mut codec, b"MESSAGE\ncontent-length:3\n\na\0b\0");
        let StompItem::Frame(frame) = &items[0] else {
            panic!("expected frame");
        };
        assert_eq!(frame.body, Bytes::from_static(b"a\0b"));
    }

    #[test]
    fn test_partial_input_waits_for_more() {
        let mut codec = StompCodec::new();
        let mut buf = BytesMut::from(&b"MESSAGE\ndestination:/q"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n\nbo");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"dy\0");
        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(StompItem::Frame(_))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_crlf_lines_and_escaped_headers() {
        let mut codec = StompCodec::new();
        let items = decode_all(&mut codec, b"\r\nERROR\r\nmessage:bad\\cthing\r\n\r\n\0");
        assert_eq!(items[0], StompItem::Heartbeat);
        let StompItem::Frame(frame) = &items[1] else {
            panic!("expected frame");
        };
        assert_eq!(frame.command, Command::Error);
        assert_eq!(frame.get("message"), Some("bad:thing"));
    }

    #[test]
    fn test_connected_headers_are_not_unescaped() {
        let mut codec = StompCodec::new();
        let items = decode_all(&mut codec, b"CONNECTED\nserver:x\\c1\n\n\0");
        let StompItem::Frame(frame) = &items[0] else {
            panic!("expected frame");
        };
        assert_eq!(frame.get("server"), Some("x\\c1"));
    }

    #[test]
    fn test_encode_adds_content_length_and_escapes() {
        let mut codec = StompCodec::new();
        let mut dst = BytesMut::new();
        let frame = Frame::new(Command::Send)
            .header("destination", "/queue/a:b")
            .body("hi");
        codec.encode(StompItem::Frame(frame.clone()), &mut dst).unwrap();
        assert_eq!(
            &dst[..],
            b"SEND\ndestination:/queue/a\\cb\ncontent-length:2\n\nhi\0"
        );

        let decoded = decode_all(&mut codec, &dst);
        let StompItem::Frame(back) = &decoded[0] else {
            panic!("expected frame");
        };
        assert_eq!(back.get("destination"), Some("/queue/a:b"));
        assert_eq!(back.body, frame.body);
    }

    #[test]
    fn test_encode_heartbeat() {
        let mut codec = StompCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(StompItem::Heartbeat, &mut dst).unwrap();
        assert_eq!(&dst[..], b"\n");
    }

    #[test]
    fn test_errors() {
        let mut codec = StompCodec::new();
        let mut buf = BytesMut::from(&b"FROB\n\n\0"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(StompError::Protocol(_))));

        let mut buf = BytesMut::from(&b"MESSAGE\nno-colon\n\n\0"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(StompError::Protocol(_))));

        let mut buf = BytesMut::from(&b"MESSAGE\ncontent-length:1\n\nab\0"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(StompError::Protocol(_))));

        let mut small = StompCodec::with_max_frame_size(8);
        let mut buf = BytesMut::from(&b"MESSAGE\nheader:value"[..]);
        assert!(matches!(
            small.decode(&mut buf),
            Err(StompError::FrameTooLarge { .. })
        ));
    }
}
