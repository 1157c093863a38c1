//! Typed terminal events and the broadcast bus that delivers them.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::message::ResponseCode;
use crate::transaction::TransactionInfo;

pub const USE_CARD: &str = "use_card";
pub const WRITE_PIN: &str = "write_pin";
pub const PROCESSING_PAYMENT: &str = "processing_payment";
pub const PAYMENT_VOUCHER: &str = "payment_voucher";
pub const TRANSACTIONS_CLOSE: &str = "transactions_close";
pub const POLLING_RESPONSE: &str = "polling_response";
pub const LAST_PAYMENT_RESPONSE: &str = "last_payment_response";
pub const CANCELED_TRANSACTION: &str = "canceled_transaction";
pub const INITIALIZATION_REQUEST: &str = "initialization_request";
pub const INITIALIZATION_RESPONSE_REQUEST: &str = "initialization_response_request";
pub const INITIALIZATION_RESPONSE_RESPONSE: &str = "initialization_response_response";
pub const ERROR: &str = "error";
pub const TRANSPORT_ERROR: &str = "transport_error";

/// Every event name the bus can deliver.
pub const EVENT_NAMES: [&str; 13] = [
    USE_CARD,
    WRITE_PIN,
    PROCESSING_PAYMENT,
    PAYMENT_VOUCHER,
    TRANSACTIONS_CLOSE,
    POLLING_RESPONSE,
    LAST_PAYMENT_RESPONSE,
    CANCELED_TRANSACTION,
    INITIALIZATION_REQUEST,
    INITIALIZATION_RESPONSE_REQUEST,
    INITIALIZATION_RESPONSE_RESPONSE,
    ERROR,
    TRANSPORT_ERROR,
];

/// A notification derived from terminal traffic.
///
/// Serializes as `{"event": "<name>", ...payload}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TerminalEvent {
    /// The terminal asks the customer to present a card.
    UseCard,
    /// The terminal asks for the PIN.
    WritePin,
    /// The sale is being authorized.
    ProcessingPayment,
    /// Approved sale with its voucher.
    PaymentVoucher {
        transaction: TransactionInfo,
        voucher: Vec<String>,
    },
    /// Settlement report.
    TransactionsClose { report: Vec<String> },
    /// The terminal acknowledged a poll.
    PollingResponse,
    /// Reprint of the last sale.
    LastPaymentResponse {
        response_code: String,
        voucher: Vec<String>,
    },
    /// Result of a cancel request.
    CanceledTransaction { response_code: String },
    /// The terminal acknowledged an initialization request.
    InitializationRequest,
    /// The terminal replied to an initialization-result request.
    InitializationResponseRequest,
    /// Initialization result; `fields` excludes the type code.
    InitializationResponseResponse { fields: Vec<String> },
    /// The terminal reported a failure code.
    Error {
        code: ResponseCode,
        kind: &'static str,
    },
    /// The link failed underneath the driver.
    TransportError { message: String },
}

impl TerminalEvent {
    pub fn error(code: ResponseCode) -> Self {
        Self::Error {
            code,
            kind: code.kind(),
        }
    }

    /// Stable event name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UseCard => USE_CARD,
            Self::WritePin => WRITE_PIN,
            Self::ProcessingPayment => PROCESSING_PAYMENT,
            Self::PaymentVoucher { .. } => PAYMENT_VOUCHER,
            Self::TransactionsClose { .. } => TRANSACTIONS_CLOSE,
            Self::PollingResponse => POLLING_RESPONSE,
            Self::LastPaymentResponse { .. } => LAST_PAYMENT_RESPONSE,
            Self::CanceledTransaction { .. } => CANCELED_TRANSACTION,
            Self::InitializationRequest => INITIALIZATION_REQUEST,
            Self::InitializationResponseRequest => INITIALIZATION_RESPONSE_REQUEST,
            Self::InitializationResponseResponse { .. } => INITIALIZATION_RESPONSE_RESPONSE,
            Self::Error { .. } => ERROR,
            Self::TransportError { .. } => TRANSPORT_ERROR,
        }
    }
}

/// Fan-out of [`TerminalEvent`]s to any number of subscribers.
///
/// Emitting never blocks. A subscriber that falls more than the configured
/// capacity behind loses the oldest events and is told how many it missed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TerminalEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `event` to every current subscriber.
    pub fn emit(&self, event: TerminalEvent) {
        debug!(event = event.name(), "emit");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Run `handler` for each event called `name` on a background task.
    ///
    /// The task ends when the bus is dropped or the handle is aborted.
    pub fn on<F>(&self, name: &'static str, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(TerminalEvent) + Send + 'static,
    {
        let mut events = self.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.name() == name => handler(event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(event = name, missed, "handler lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
