use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tracing::{trace, warn};

use crate::codec::{decode_fields, DecodedMessage, DEFAULT_MAX_FRAME_LEN};
use crate::error::FrameError;
use crate::lrc;
use crate::wire::{ControlSignal, ETX, STX};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// What to do with the LRC byte that trails every incoming frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Emit the frame as soon as `ETX` arrives and discard the LRC unread.
    #[default]
    Ignore,
    /// Wait for the LRC, log a mismatch, emit the frame anyway.
    Warn,
    /// Wait for the LRC and drop frames whose checksum does not match.
    Reject,
}

/// Configuration for the frame assembler.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 4 KiB.
    pub max_frame_len: usize,
    /// Trailing checksum handling. Default: [`ChecksumPolicy::Ignore`].
    pub checksum: ChecksumPolicy,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            checksum: ChecksumPolicy::default(),
        }
    }
}

/// An item recovered from the inbound byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A bare `ACK`/`NAK`.
    Control(ControlSignal),
    /// A complete frame.
    Message(DecodedMessage),
}

/// Observable assembler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// No partial frame.
    Idle,
    /// `STX` seen, collecting the body until `ETX`.
    Accumulating,
    /// An oversized frame is being skipped up to its `ETX`.
    Discarding,
    /// `ETX` seen, the next byte is the frame's LRC.
    AwaitingChecksum,
}

enum State {
    Idle,
    Accumulating,
    Discarding,
    /// Holds the body when the checksum policy must see the LRC first.
    AwaitingChecksum(Option<Bytes>),
}

/// Reassembles transport chunks into frames and control signals.
///
/// Chunks may split a frame anywhere or bundle several frames and control
/// bytes together; both converge on the same output. State persists across
/// calls to [`FrameAssembler::push`] and is reset on every completed frame.
pub struct FrameAssembler {
    state: State,
    buf: BytesMut,
    config: FrameConfig,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create an assembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            state: State::Idle,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Feed one transport chunk, returning everything it completed.
    ///
    /// A chunk that is exactly one `ACK`/`NAK` byte is reported immediately
    /// and leaves any partial frame untouched, even mid-accumulation. The
    /// only exception is a pending LRC: the byte right after `ETX` always
    /// belongs to the frame.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Inbound> {
        let mut out = Vec::new();

        if let [byte] = chunk {
            if !matches!(self.state, State::AwaitingChecksum(_)) {
                if let Some(signal) = ControlSignal::from_byte(*byte) {
                    trace!(signal = signal.name(), "control byte");
                    out.push(Inbound::Control(signal));
                    return out;
                }
            }
        }

        for &byte in chunk {
            self.step(byte, &mut out);
        }
        out
    }

    /// Current state.
    pub fn state(&self) -> AssemblerState {
        match self.state {
            State::Idle => AssemblerState::Idle,
            State::Accumulating => AssemblerState::Accumulating,
            State::Discarding => AssemblerState::Discarding,
            State::AwaitingChecksum(_) => AssemblerState::AwaitingChecksum,
        }
    }

    /// Bytes collected for the frame in progress.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = State::Idle;
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn step(&mut self, byte: u8, out: &mut Vec<Inbound>) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {
                if byte == STX {
                    self.buf.clear();
                    self.state = State::Accumulating;
                } else if let Some(signal) = ControlSignal::from_byte(byte) {
                    out.push(Inbound::Control(signal));
                } else {
                    trace!(byte, "dropping byte outside a frame");
                }
            }
            State::Accumulating => {
                if byte == ETX {
                    self.complete(out);
                } else if self.buf.len() >= self.config.max_frame_len {
                    let err = FrameError::FrameTooLarge {
                        size: self.buf.len() + 1,
                        max: self.config.max_frame_len,
                    };
                    warn!(error = %err, "discarding oversized frame");
                    self.buf.clear();
                    self.state = State::Discarding;
                } else {
                    self.buf.put_u8(byte);
                    self.state = State::Accumulating;
                }
            }
            // The tail of the dropped frame, its ETX and LRC included, is
            // never read as control bytes or a new frame start.
            State::Discarding => {
                self.state = if byte == ETX {
                    State::AwaitingChecksum(None)
                } else {
                    State::Discarding
                };
            }
            State::AwaitingChecksum(held) => {
                if let Some(body) = held {
                    self.check(body, byte, out);
                } else {
                    trace!(lrc = byte, "discarding trailing checksum");
                }
            }
        }
    }

    fn complete(&mut self, out: &mut Vec<Inbound>) {
        let body = self.buf.split().freeze();
        match self.config.checksum {
            ChecksumPolicy::Ignore => {
                out.push(Inbound::Message(decode_fields(&body)));
                self.state = State::AwaitingChecksum(None);
            }
            ChecksumPolicy::Warn | ChecksumPolicy::Reject => {
                self.state = State::AwaitingChecksum(Some(body));
            }
        }
    }

    fn check(&mut self, body: Bytes, actual: u8, out: &mut Vec<Inbound>) {
        let expected = lrc::compute(&body);
        if expected == actual {
            out.push(Inbound::Message(decode_fields(&body)));
            return;
        }

        let err = FrameError::ChecksumMismatch { expected, actual };
        let message = decode_fields(&body);
        match self.config.checksum {
            ChecksumPolicy::Reject => {
                warn!(error = %err, type_code = message.type_code(), "dropping frame");
            }
            _ => {
                warn!(error = %err, type_code = message.type_code(), "accepting frame");
                out.push(Inbound::Message(message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::wire::{ACK, NAK};

    fn messages(items: &[Inbound]) -> Vec<Vec<String>> {
        items
            .iter()
            .filter_map(|item| match item {
                Inbound::Message(msg) => Some(msg.fields().to_vec()),
                Inbound::Control(_) => None,
            })
            .collect()
    }

    #[test]
    fn lone_ack_and_nak() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.push(&[ACK]), vec![Inbound::Control(ControlSignal::Ack)]);
        assert_eq!(asm.push(&[NAK]), vec![Inbound::Control(ControlSignal::Nak)]);
        assert_eq!(asm.state(), AssemblerState::Idle);
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let mut asm = FrameAssembler::new();
        let out = asm.push(&encode("0900|80"));
        assert_eq!(messages(&out), vec![vec!["0900", "80"]]);
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.pending_len(), 0);
    }

    #[test]
    fn frame_split_across_chunks() {
        let wire = encode("0210|06");
        let mut asm = FrameAssembler::new();

        assert!(asm.push(&wire[..3]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Accumulating);
        let out = asm.push(&wire[3..wire.len() - 1]);
        assert_eq!(messages(&out), vec![vec!["0210", "06"]]);
        assert_eq!(asm.state(), AssemblerState::AwaitingChecksum);

        assert!(asm.push(&wire[wire.len() - 1..]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);
    }

    #[test]
    fn ack_mid_accumulation_keeps_partial_frame() {
        let wire = encode("0510|00");
        let mut asm = FrameAssembler::new();

        assert!(asm.push(&wire[..4]).is_empty());
        assert_eq!(asm.push(&[ACK]), vec![Inbound::Control(ControlSignal::Ack)]);
        assert_eq!(asm.state(), AssemblerState::Accumulating);

        let out = asm.push(&wire[4..]);
        assert_eq!(messages(&out), vec![vec!["0510", "00"]]);
    }

    #[test]
    fn bundled_frames_and_control_bytes() {
        let mut chunk = vec![ACK];
        chunk.extend_from_slice(&encode("0900|80"));
        chunk.extend_from_slice(&encode("0900|81"));
        chunk.push(NAK);

        let mut asm = FrameAssembler::new();
        let out = asm.push(&chunk);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], Inbound::Control(ControlSignal::Ack));
        assert_eq!(messages(&out), vec![vec!["0900", "80"], vec!["0900", "81"]]);
        assert_eq!(out[3], Inbound::Control(ControlSignal::Nak));
    }

    #[test]
    fn noise_outside_frames_is_dropped() {
        let mut chunk = b"garbage".to_vec();
        chunk.extend_from_slice(&encode("0100"));
        let mut asm = FrameAssembler::new();
        assert_eq!(messages(&asm.push(&chunk)), vec![vec!["0100"]]);
    }

    #[test]
    fn lrc_equal_to_ack_is_not_a_control_signal() {
        // "0104": 0x30 ^ 0x31 ^ 0x30 ^ 0x34 ^ 0x03 == 0x06
        let wire = encode("0104");
        assert_eq!(wire[wire.len() - 1], ACK);

        let mut asm = FrameAssembler::new();
        let out = asm.push(&wire[..wire.len() - 1]);
        assert_eq!(messages(&out), vec![vec!["0104"]]);
        assert!(asm.push(&[ACK]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);
    }

    #[test]
    fn warn_policy_emits_on_mismatch() {
        let mut wire = encode("0260|00").to_vec();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let mut asm = FrameAssembler::with_config(FrameConfig {
            checksum: ChecksumPolicy::Warn,
            ..FrameConfig::default()
        });
        assert!(asm.push(&wire[..last]).is_empty());
        assert_eq!(messages(&asm.push(&wire[last..])), vec![vec!["0260", "00"]]);
    }

    #[test]
    fn reject_policy_drops_on_mismatch() {
        let mut wire = encode("0260|00").to_vec();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;

        let mut asm = FrameAssembler::with_config(FrameConfig {
            checksum: ChecksumPolicy::Reject,
            ..FrameConfig::default()
        });
        assert!(asm.push(&wire).is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);

        let out = asm.push(&encode("0260|00"));
        assert_eq!(messages(&out), vec![vec!["0260", "00"]]);
    }

    #[test]
    fn oversized_frame_is_discarded() {
        let mut asm = FrameAssembler::with_config(FrameConfig {
            max_frame_len: 8,
            ..FrameConfig::default()
        });
        let long = format!("0210|{}", "x".repeat(32));
        let wire = encode(&long);
        assert!(asm.push(&wire[..12]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Discarding);
        assert!(asm.push(&wire[12..]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);

        let out = asm.push(&encode("0100"));
        assert_eq!(messages(&out), vec![vec!["0100"]]);
    }

    #[test]
    fn oversized_frame_trailer_is_not_misread() {
        let config = FrameConfig {
            max_frame_len: 8,
            ..FrameConfig::default()
        };

        // LRC of this body is ACK.
        let wire = encode("0210|XXXXXXXXXXZ ");
        assert_eq!(wire[wire.len() - 1], ACK);
        let mut asm = FrameAssembler::with_config(config.clone());
        assert!(asm.push(&wire).is_empty());
        assert_eq!(asm.state(), AssemblerState::Idle);

        // LRC of this body is STX; the next frame must survive intact.
        let wire = encode("0210|XXXXXXXXXX^ ");
        assert_eq!(wire[wire.len() - 1], STX);
        let mut chunk = wire.to_vec();
        chunk.extend_from_slice(&encode("0900|80"));
        let mut asm = FrameAssembler::with_config(config);
        assert_eq!(messages(&asm.push(&chunk)), vec![vec!["0900", "80"]]);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut asm = FrameAssembler::new();
        asm.push(&encode("0900|80")[..4]);
        assert!(asm.pending_len() > 0);
        asm.reset();
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.pending_len(), 0);
    }
}
