use std::time::Duration;

use crate::handshake::HandshakeKind;

/// Errors that can occur in terminal operations.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// Transport-level error while opening the link.
    #[error("transport error: {0}")]
    Transport(#[from] ux300_transport::TransportError),

    /// Write failed on the open link.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The link is closed and automatic reopen is disabled.
    #[error("terminal link is not open")]
    NotOpen,

    /// A handshake of the same kind is still waiting for its ACK.
    #[error("{0} handshake already in flight")]
    HandshakeInFlight(HandshakeKind),

    /// No ACK arrived within the configured handshake timeout.
    #[error("no acknowledgement after {0:?}")]
    Timeout(Duration),

    /// A command field contains a byte reserved by the framing.
    #[error("invalid field {0:?}: contains a reserved framing byte")]
    InvalidField(String),

    /// The link went down while a handshake was pending.
    #[error("terminal link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TerminalError>;
