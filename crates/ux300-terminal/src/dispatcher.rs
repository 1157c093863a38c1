use tracing::{debug, info, warn};
use ux300_frame::DecodedMessage;

use crate::events::TerminalEvent;
use crate::handshake::HandshakeKind;
use crate::message::{self, IntermediateCode, ResponseCode};
use crate::transaction::{self, voucher_lines, TransactionInfo, VOUCHER_LINE_WIDTH};

/// What the driver does in response to one inbound item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// Event to publish, if any.
    pub event: Option<TerminalEvent>,
    /// Whether to answer the terminal with an ACK.
    pub ack: bool,
}

impl Dispatch {
    fn ignore() -> Self {
        Self::default()
    }

    fn ack_only() -> Self {
        Self {
            event: None,
            ack: true,
        }
    }

    fn emit(event: TerminalEvent) -> Self {
        Self {
            event: Some(event),
            ack: false,
        }
    }

    fn emit_and_ack(event: TerminalEvent) -> Self {
        Self {
            event: Some(event),
            ack: true,
        }
    }
}

/// Maps decoded messages to events and ACK decisions.
///
/// Pure: the dispatcher never touches the link.
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    voucher_width: usize,
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::with_voucher_width(VOUCHER_LINE_WIDTH)
    }

    pub fn with_voucher_width(width: usize) -> Self {
        Self {
            voucher_width: width.max(1),
        }
    }

    pub fn dispatch(&self, message: &DecodedMessage) -> Dispatch {
        let status = message.field(1).unwrap_or_default();
        match message.type_code() {
            message::INTERMEDIATE => self.intermediate(message, status),
            message::PAYMENT_RESPONSE => self.payment(message, status),
            message::CLOSE_TRANSACTIONS_RESPONSE => self.close(message, status),
            message::LOAD_KEYS_RESPONSE => {
                info!(fields = ?&message.fields()[1..], "load keys response");
                Dispatch::ack_only()
            }
            message::POLLING => Dispatch::emit_and_ack(TerminalEvent::PollingResponse),
            message::LAST_PAYMENT_RESPONSE => {
                Dispatch::emit_and_ack(TerminalEvent::LastPaymentResponse {
                    response_code: status.to_string(),
                    voucher: self.voucher(message, transaction::VOUCHER),
                })
            }
            message::CANCEL_RESPONSE => {
                Dispatch::emit_and_ack(TerminalEvent::CanceledTransaction {
                    response_code: status.to_string(),
                })
            }
            message::INITIALIZATION => Dispatch::emit(TerminalEvent::InitializationRequest),
            message::INITIALIZATION_RESPONSE => {
                Dispatch::emit(TerminalEvent::InitializationResponseRequest)
            }
            message::INITIALIZATION_RESPONSE_RESULT => {
                Dispatch::emit(TerminalEvent::InitializationResponseResponse {
                    fields: message.fields()[1..].to_vec(),
                })
            }
            other => {
                warn!(type_code = other, fields = ?message.fields(), "unrecognized message");
                Dispatch::ignore()
            }
        }
    }

    /// Side effects of an ACK that answered a handshake command.
    pub fn on_handshake_ack(&self, kind: HandshakeKind) -> Dispatch {
        match kind {
            HandshakeKind::Polling => Dispatch::emit_and_ack(TerminalEvent::PollingResponse),
            HandshakeKind::Initialization => Dispatch::emit(TerminalEvent::InitializationRequest),
        }
    }

    fn intermediate(&self, message: &DecodedMessage, status: &str) -> Dispatch {
        let event = match IntermediateCode::from_code(status) {
            Some(IntermediateCode::UseCard) => TerminalEvent::UseCard,
            Some(IntermediateCode::WritePin) => TerminalEvent::WritePin,
            Some(IntermediateCode::ProcessingPayment) => TerminalEvent::ProcessingPayment,
            None => {
                warn!(
                    code = status,
                    fields = ?message.fields(),
                    "unrecognized intermediate message"
                );
                return Dispatch::ignore();
            }
        };
        Dispatch::emit(event)
    }

    fn payment(&self, message: &DecodedMessage, status: &str) -> Dispatch {
        match ResponseCode::from_code(status) {
            Some(ResponseCode::Approved) => {
                // An empty voucher field still counts as present.
                if message.field(transaction::VOUCHER).is_none() {
                    debug!("approved sale without voucher field");
                    return Dispatch::emit_and_ack(TerminalEvent::error(ResponseCode::Approved));
                }
                Dispatch::emit_and_ack(TerminalEvent::PaymentVoucher {
                    transaction: TransactionInfo::from_message(message),
                    voucher: self.voucher(message, transaction::VOUCHER),
                })
            }
            Some(code) if code.is_transaction_error() => {
                Dispatch::emit_and_ack(TerminalEvent::error(code))
            }
            _ => {
                warn!(code = status, fields = ?message.fields(), "unrecognized sale response");
                Dispatch::ignore()
            }
        }
    }

    fn close(&self, message: &DecodedMessage, status: &str) -> Dispatch {
        match ResponseCode::from_code(status) {
            Some(ResponseCode::Approved) => {
                Dispatch::emit_and_ack(TerminalEvent::TransactionsClose {
                    report: self.voucher(message, transaction::CLOSE_REPORT),
                })
            }
            Some(code) if code.is_transaction_error() => {
                Dispatch::emit_and_ack(TerminalEvent::error(code))
            }
            _ => {
                warn!(code = status, fields = ?message.fields(), "unrecognized close response");
                Dispatch::ignore()
            }
        }
    }

    fn voucher(&self, message: &DecodedMessage, index: usize) -> Vec<String> {
        voucher_lines(message.field(index).unwrap_or_default(), self.voucher_width)
    }
}
