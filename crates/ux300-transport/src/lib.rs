//! Byte-stream transport abstraction for UX300 terminals.
//!
//! The terminal driver never opens a port itself. It asks a [`Connector`]
//! for a fresh duplex stream whenever a link has to be (re)established:
//! - [`SerialConnector`] opens a serial line through `tokio-serial`
//! - [`StreamConnector`] hands out pre-opened streams (pipes, sockets, tests)
//!
//! This is the lowest layer of ux300. Everything else builds on top of
//! the streams produced here.

pub mod connector;
pub mod error;
pub mod serial;

pub use connector::{Connector, StreamConnector};
pub use error::{Result, TransportError};
pub use serial::{FlowControl, Parity, SerialConfig, SerialConnector, DEFAULT_BAUD_RATE};
