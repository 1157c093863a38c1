//! Host-side driver for UX300 payment terminals.
//!
//! The terminal speaks a small STX/ETX framed protocol over a serial line.
//! This crate re-exports the layers that implement it.
//!
//! # Crate Structure
//!
//! - [`transport`]: how a byte stream to the terminal is opened (serial, in-memory)
//! - [`frame`]: wire framing, LRC checksum and the fragment assembler
//! - [`terminal`]: the driver, its commands and the typed event bus

/// Re-export transport types.
pub mod transport {
    pub use ux300_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ux300_frame::*;
}

/// Re-export driver types.
pub mod terminal {
    pub use ux300_terminal::*;
}

pub use ux300_terminal::{Terminal, TerminalConfig, TerminalError, TerminalEvent};
pub use ux300_transport::{SerialConfig, SerialConnector};
