use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;

use crate::lrc;
use crate::wire::{ControlSignal, ETX, SEP, STX};

/// Default cap on an accumulated frame body: 4 KiB.
///
/// The longest terminal messages are close reports and vouchers, both well
/// under this size.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024;

/// A decoded message: the ordered `|`-separated fields of one frame.
///
/// `fields()[0]` is the 4-digit message type code. Decoding always yields at
/// least one (possibly empty) field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    fields: Vec<String>,
}

impl DecodedMessage {
    /// Build a message from already-split fields.
    pub fn from_fields(fields: Vec<String>) -> Self {
        if fields.is_empty() {
            return Self {
                fields: vec![String::new()],
            };
        }
        Self { fields }
    }

    /// The message type code (field 0).
    pub fn type_code(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    /// Field `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    /// Number of fields. Never zero: an empty body decodes to one empty
    /// type code.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// An item written to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A framed body, e.g. `0200|1500|T-1|1|1`.
    Frame(String),
    /// A bare control byte.
    Control(ControlSignal),
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────┬──────┬──────┐
/// │ STX  │ body                     │ ETX  │ LRC  │
/// │ 0x02 │ code [ '|' field ]*      │ 0x03 │ 1B   │
/// └──────┴──────────────────────────┴──────┴──────┘
/// ```
///
/// The body is written as-is; field content is the caller's concern.
pub fn encode_frame(body: &str, dst: &mut BytesMut) {
    let body = body.as_bytes();
    dst.reserve(body.len() + 3);
    dst.put_u8(STX);
    dst.put_slice(body);
    dst.put_u8(ETX);
    dst.put_u8(lrc::compute(body));
}

/// Encode a frame into a fresh buffer.
pub fn encode(body: &str) -> Bytes {
    let mut buf = BytesMut::new();
    encode_frame(body, &mut buf);
    buf.freeze()
}

/// Split a frame body (no markers) into fields.
pub fn decode_fields(body: &[u8]) -> DecodedMessage {
    let fields = body
        .split(|byte| *byte == SEP)
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect();
    DecodedMessage::from_fields(fields)
}

/// Decode raw frame bytes.
///
/// A leading `STX` is stripped and everything from the first `ETX` on (the
/// end marker and LRC) is ignored. Never fails: malformed input simply
/// yields odd fields, which the dispatcher treats as unrecognized.
pub fn decode_frame(frame: &[u8]) -> DecodedMessage {
    let body = frame.strip_prefix(&[STX]).unwrap_or(frame);
    let body = match body.iter().position(|byte| *byte == ETX) {
        Some(end) => &body[..end],
        None => body,
    };
    decode_fields(body)
}

/// `tokio_util` encoder for everything the driver writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Outbound> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Outbound::Frame(body) => encode_frame(&body, dst),
            Outbound::Control(signal) => dst.put_u8(signal.byte()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::SinkExt;
    use tokio::io::AsyncReadExt;
    use tokio_util::codec::FramedWrite;

    use super::*;
    use crate::wire::ACK;

    fn split(body: &str) -> Vec<String> {
        body.split('|').map(str::to_string).collect()
    }

    #[test]
    fn encode_polling() {
        let wire = encode("0100");
        assert_eq!(wire.as_ref(), &[STX, b'0', b'1', b'0', b'0', ETX, 0x02]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        for body in ["0100", "0200|1500|T-0042|1|1", "0500|1", "0210|00||x"] {
            let decoded = decode_frame(&encode(body));
            assert_eq!(decoded.fields(), split(body).as_slice());
        }
    }

    #[test]
    fn decode_without_markers() {
        let decoded = decode_frame(b"0900|80");
        assert_eq!(decoded.type_code(), "0900");
        assert_eq!(decoded.field(1), Some("80"));
        assert_eq!(decoded.field(2), None);
    }

    #[test]
    fn decode_empty_and_short_input() {
        let decoded = decode_frame(&[]);
        assert_eq!(decoded.field_count(), 1);
        assert_eq!(decoded.type_code(), "");

        let decoded = decode_frame(&[STX, ETX]);
        assert_eq!(decoded.fields(), [String::new()]);
    }

    #[test]
    fn decode_keeps_empty_fields() {
        let decoded = decode_fields(b"0210|00|||");
        assert_eq!(decoded.field_count(), 5);
        assert_eq!(decoded.field(4), Some(""));
    }

    #[test]
    fn decode_is_lossy_on_invalid_utf8() {
        let decoded = decode_fields(&[b'0', b'2', b'1', b'0', SEP, 0xFF]);
        assert_eq!(decoded.type_code(), "0210");
        assert_eq!(decoded.field(1), Some("\u{FFFD}"));
    }

    #[test]
    fn from_fields_never_empty() {
        let decoded = DecodedMessage::from_fields(Vec::new());
        assert_eq!(decoded.type_code(), "");
        assert_eq!(decoded.field_count(), 1);
    }

    #[tokio::test]
    async fn framed_write_encodes_frames_and_control_bytes() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut framed = FramedWrite::new(client, FrameCodec::new());

        framed
            .send(Outbound::Frame("0100".to_string()))
            .await
            .unwrap();
        framed
            .send(Outbound::Control(ControlSignal::Ack))
            .await
            .unwrap();

        let mut buf = [0u8; 8];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf[..7], encode("0100").as_ref());
        assert_eq!(buf[7], ACK);
    }
}
