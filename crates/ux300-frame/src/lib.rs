//! Framing for the UX300 serial protocol.
//!
//! Every message on the wire is wrapped as:
//! - a start marker (`STX`, 0x02)
//! - a `|`-separated ASCII body whose first field is a 4-digit type code
//! - an end marker (`ETX`, 0x03)
//! - a single LRC byte, the XOR of the body and `ETX`
//!
//! Bare `ACK`/`NAK` bytes travel outside frames. The [`FrameAssembler`]
//! turns arbitrarily chunked transport reads into frames and control
//! signals, so callers never see partial messages.

pub mod assembler;
pub mod codec;
pub mod error;
pub mod lrc;
pub mod wire;

pub use assembler::{AssemblerState, ChecksumPolicy, FrameAssembler, FrameConfig, Inbound};
pub use codec::{
    decode_fields, decode_frame, encode, encode_frame, DecodedMessage, FrameCodec, Outbound,
    DEFAULT_MAX_FRAME_LEN,
};
pub use error::{FrameError, Result};
pub use wire::{ControlSignal, ACK, ETX, NAK, SEP, STX};
