use std::collections::VecDeque;
use std::fmt;

use tokio::sync::oneshot;
use tracing::trace;

use crate::error::{Result, TerminalError};
use crate::message;

/// Commands the terminal answers with a bare ACK instead of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeKind {
    Polling,
    Initialization,
}

impl HandshakeKind {
    /// Type code of the outgoing command.
    pub fn type_code(self) -> &'static str {
        match self {
            Self::Polling => message::POLLING,
            Self::Initialization => message::INITIALIZATION,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Initialization => "initialization",
        }
    }
}

impl fmt::Display for HandshakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pending handshakes waiting for an ACK, oldest first.
///
/// At most one handshake of each kind is in flight. The next inbound ACK
/// resolves the oldest one whose caller is still waiting.
#[derive(Debug, Default)]
pub struct HandshakeTable {
    pending: VecDeque<(HandshakeKind, oneshot::Sender<()>)>,
}

impl HandshakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `kind`.
    ///
    /// Fails with [`TerminalError::HandshakeInFlight`] while a live waiter of
    /// the same kind exists. A slot whose waiter has gone away is reclaimed.
    pub fn register(&mut self, kind: HandshakeKind) -> Result<oneshot::Receiver<()>> {
        self.pending
            .retain(|(pending, waiter)| *pending != kind || !waiter.is_closed());
        if self.is_pending(kind) {
            return Err(TerminalError::HandshakeInFlight(kind));
        }
        let (tx, rx) = oneshot::channel();
        self.pending.push_back((kind, tx));
        trace!(kind = kind.name(), "handshake registered");
        Ok(rx)
    }

    /// Resolve the oldest live handshake with an ACK.
    ///
    /// Slots whose caller has gone away are dropped first. Returns the
    /// resolved kind, or `None` when nothing was waiting.
    pub fn resolve_ack(&mut self) -> Option<HandshakeKind> {
        while let Some((kind, waiter)) = self.pending.pop_front() {
            if waiter.send(()).is_ok() {
                return Some(kind);
            }
            trace!(kind = kind.name(), "dropping abandoned handshake");
        }
        None
    }

    /// Drop the slot for `kind` without resolving it.
    pub fn cancel(&mut self, kind: HandshakeKind) {
        self.pending.retain(|(pending, _)| *pending != kind);
    }

    /// Drop every slot. Waiters observe a closed channel.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, kind: HandshakeKind) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_commands() {
        assert_eq!(HandshakeKind::Polling.type_code(), "0100");
        assert_eq!(HandshakeKind::Initialization.type_code(), "0070");
        assert_eq!(HandshakeKind::Polling.to_string(), "polling");
    }

    #[tokio::test]
    async fn ack_resolves_waiter() {
        let mut table = HandshakeTable::new();
        let rx = table.register(HandshakeKind::Polling).unwrap();
        assert_eq!(table.resolve_ack(), Some(HandshakeKind::Polling));
        rx.await.unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn second_registration_of_same_kind_fails() {
        let mut table = HandshakeTable::new();
        let _rx = table.register(HandshakeKind::Polling).unwrap();
        let err = table.register(HandshakeKind::Polling).unwrap_err();
        assert!(matches!(
            err,
            TerminalError::HandshakeInFlight(HandshakeKind::Polling)
        ));
        assert!(table.register(HandshakeKind::Initialization).is_ok());
    }

    #[test]
    fn abandoned_slot_is_reclaimed() {
        let mut table = HandshakeTable::new();
        drop(table.register(HandshakeKind::Polling).unwrap());
        assert!(table.register(HandshakeKind::Polling).is_ok());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn acks_resolve_in_registration_order() {
        let mut table = HandshakeTable::new();
        let _init = table.register(HandshakeKind::Initialization).unwrap();
        let _poll = table.register(HandshakeKind::Polling).unwrap();
        assert_eq!(table.resolve_ack(), Some(HandshakeKind::Initialization));
        assert_eq!(table.resolve_ack(), Some(HandshakeKind::Polling));
        assert_eq!(table.resolve_ack(), None);
    }

    #[tokio::test]
    async fn ack_skips_abandoned_slots() {
        let mut table = HandshakeTable::new();
        drop(table.register(HandshakeKind::Polling).unwrap());
        let init = table.register(HandshakeKind::Initialization).unwrap();

        assert_eq!(table.resolve_ack(), Some(HandshakeKind::Initialization));
        init.await.unwrap();
        assert!(table.is_empty());

        drop(table.register(HandshakeKind::Polling).unwrap());
        assert_eq!(table.resolve_ack(), None);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn cancel_and_clear_close_waiters() {
        let mut table = HandshakeTable::new();
        let poll = table.register(HandshakeKind::Polling).unwrap();
        let init = table.register(HandshakeKind::Initialization).unwrap();

        table.cancel(HandshakeKind::Polling);
        assert!(poll.await.is_err());
        assert!(table.is_pending(HandshakeKind::Initialization));

        table.clear();
        assert!(init.await.is_err());
    }
}
