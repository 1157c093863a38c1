//! Driver for UX300 payment terminals.
//!
//! The [`Terminal`] owns the link to one terminal. It writes commands,
//! answers the terminal's frames with ACKs where the protocol asks for them,
//! and turns everything it receives into typed [`TerminalEvent`]s.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod handshake;
mod link;
pub mod message;
pub mod station;
pub mod terminal;
pub mod transaction;

pub use config::TerminalConfig;
pub use dispatcher::{Dispatch, MessageDispatcher};
pub use error::{Result, TerminalError};
pub use events::{EventBus, TerminalEvent, EVENT_NAMES};
pub use handshake::{HandshakeKind, HandshakeTable};
pub use message::{IntermediateCode, ResponseCode};
pub use station::{Command, CommandStation};
pub use terminal::Terminal;
pub use transaction::{voucher_lines, CardDetail, TransactionInfo, VOUCHER_LINE_WIDTH};
