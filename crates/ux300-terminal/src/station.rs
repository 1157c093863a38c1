use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use ux300_frame::{wire, Outbound, SEP};
use ux300_transport::Connector;

use crate::config::TerminalConfig;
use crate::dispatcher::MessageDispatcher;
use crate::error::{Result, TerminalError};
use crate::events::EventBus;
use crate::handshake::HandshakeKind;
use crate::link::{Link, LinkContext};
use crate::message;

/// A request the host can send to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `0100`. Acknowledged with a bare ACK.
    Poll,
    /// `0070`. Acknowledged with a bare ACK.
    Initialize,
    /// `0080`.
    InitializationResponse,
    /// `0200|amount|ticket|1|1`.
    Pay { amount: u64, ticket: String },
    /// `0500|1`.
    CloseTransactions,
    /// `0250|1`.
    LastTransaction,
    /// `1200`.
    CancelTransaction,
    /// `0800`.
    LoadKeys,
    /// Any type code with arbitrary fields.
    Raw {
        type_code: String,
        fields: Vec<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Initialize => "initialize",
            Self::InitializationResponse => "initialization_response",
            Self::Pay { .. } => "pay",
            Self::CloseTransactions => "close_transactions",
            Self::LastTransaction => "last_transaction",
            Self::CancelTransaction => "cancel_transaction",
            Self::LoadKeys => "load_keys",
            Self::Raw { .. } => "raw",
        }
    }

    /// The handshake this command waits for, if the terminal answers it with
    /// a bare ACK.
    pub fn handshake(&self) -> Option<HandshakeKind> {
        match self {
            Self::Poll => Some(HandshakeKind::Polling),
            Self::Initialize => Some(HandshakeKind::Initialization),
            _ => None,
        }
    }

    /// Build the frame body.
    ///
    /// Fails with [`TerminalError::InvalidField`] if any field contains the
    /// separator or a control byte.
    pub fn body(&self) -> Result<String> {
        match self {
            Self::Poll => Ok(message::POLLING.to_string()),
            Self::Initialize => Ok(message::INITIALIZATION.to_string()),
            Self::InitializationResponse => Ok(message::INITIALIZATION_RESPONSE.to_string()),
            Self::Pay { amount, ticket } => {
                validate_field(ticket)?;
                Ok(format!("{}|{amount}|{ticket}|1|1", message::PAYMENT))
            }
            Self::CloseTransactions => Ok(format!("{}|1", message::CLOSE_TRANSACTIONS)),
            Self::LastTransaction => Ok(format!("{}|1", message::LAST_PAYMENT)),
            Self::CancelTransaction => Ok(message::CANCEL.to_string()),
            Self::LoadKeys => Ok(message::LOAD_KEYS.to_string()),
            Self::Raw { type_code, fields } => {
                validate_field(type_code)?;
                let mut body = type_code.clone();
                for field in fields {
                    validate_field(field)?;
                    body.push(char::from(SEP));
                    body.push_str(field);
                }
                Ok(body)
            }
        }
    }
}

fn validate_field(field: &str) -> Result<()> {
    if field.bytes().any(wire::is_reserved) {
        return Err(TerminalError::InvalidField(field.to_string()));
    }
    Ok(())
}

/// Sends commands over the current link, opening it on demand.
///
/// Holds at most one link at a time. When a command finds the link closed
/// and automatic reopen is enabled, a fresh stream is requested from the
/// connector.
pub struct CommandStation<C: Connector> {
    connector: C,
    config: TerminalConfig,
    bus: EventBus,
    link: Mutex<Option<Link>>,
}

impl<C: Connector> CommandStation<C> {
    pub(crate) fn new(connector: C, config: TerminalConfig, bus: EventBus) -> Self {
        Self {
            connector,
            config,
            bus,
            link: Mutex::new(None),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Open the link if it is not already open.
    pub async fn open(&self) -> Result<()> {
        let mut slot = self.link.lock().await;
        if slot.as_ref().is_some_and(|link| !link.is_closed()) {
            return Ok(());
        }
        self.replace(&mut slot).await?;
        Ok(())
    }

    /// Close the link and wait for its tasks to stop.
    pub async fn close(&self) {
        let link = self.link.lock().await.take();
        if let Some(link) = link {
            link.close().await;
            info!(endpoint = link.endpoint(), "terminal link closed");
        }
    }

    pub async fn is_open(&self) -> bool {
        self.link
            .lock()
            .await
            .as_ref()
            .is_some_and(|link| !link.is_closed())
    }

    /// Send `command` and, for handshake commands, wait for its ACK.
    ///
    /// Plain commands complete once the frame is written. Their outcome
    /// arrives later as an event.
    pub async fn execute(&self, command: &Command) -> Result<()> {
        let body = command.body()?;
        let link = self.link().await?;
        debug!(command = command.name(), endpoint = link.endpoint(), "sending");
        match command.handshake() {
            None => link.write(Outbound::Frame(body)).await,
            Some(kind) => self.handshake(&link, kind, body).await,
        }
    }

    async fn handshake(&self, link: &Link, kind: HandshakeKind, body: String) -> Result<()> {
        let ack = link.register(kind)?;
        if let Err(err) = link.write(Outbound::Frame(body)).await {
            link.cancel_handshake(kind);
            return Err(err);
        }

        let received = match self.config.handshake_timeout {
            Some(limit) => match tokio::time::timeout(limit, ack).await {
                Ok(received) => received,
                Err(_) => {
                    link.cancel_handshake(kind);
                    warn!(kind = kind.name(), timeout = ?limit, "handshake timed out");
                    return Err(TerminalError::Timeout(limit));
                }
            },
            None => ack.await,
        };
        received.map_err(|_| TerminalError::Closed)
    }

    /// The open link, reopened through the connector when allowed.
    async fn link(&self) -> Result<Link> {
        let mut slot = self.link.lock().await;
        if let Some(link) = slot.as_ref().filter(|link| !link.is_closed()) {
            return Ok(link.clone());
        }
        if !self.config.auto_reopen {
            return Err(TerminalError::NotOpen);
        }
        if slot.is_some() {
            info!(endpoint = %self.connector.describe(), "reopening terminal link");
        }
        self.replace(&mut slot).await
    }

    async fn replace(&self, slot: &mut Option<Link>) -> Result<Link> {
        if let Some(stale) = slot.take() {
            stale.close().await;
        }
        let endpoint = self.connector.describe();
        let stream = self.connector.connect().await?;
        let link = Link::spawn(stream, self.context(), endpoint);
        info!(endpoint = link.endpoint(), "terminal link open");
        *slot = Some(link.clone());
        Ok(link)
    }

    fn context(&self) -> LinkContext {
        LinkContext {
            frame: self.config.frame_config(),
            dispatcher: MessageDispatcher::with_voucher_width(self.config.voucher_line_width),
            bus: self.bus.clone(),
            write_queue: self.config.write_queue,
        }
    }
}

impl<C: Connector> Drop for CommandStation<C> {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().as_ref() {
            link.shut();
        }
    }
}
