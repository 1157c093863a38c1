//! Message type codes and the terminal's response code table.

use std::fmt;

use serde::Serialize;

/// Polling request. Answered by a bare ACK.
pub const POLLING: &str = "0100";
/// Sale request.
pub const PAYMENT: &str = "0200";
/// Sale response.
pub const PAYMENT_RESPONSE: &str = "0210";
/// Last-sale request.
pub const LAST_PAYMENT: &str = "0250";
/// Last-sale response.
pub const LAST_PAYMENT_RESPONSE: &str = "0260";
/// Close (settle) transactions request.
pub const CLOSE_TRANSACTIONS: &str = "0500";
/// Close transactions response.
pub const CLOSE_TRANSACTIONS_RESPONSE: &str = "0510";
/// Load-keys request.
pub const LOAD_KEYS: &str = "0800";
/// Load-keys response.
pub const LOAD_KEYS_RESPONSE: &str = "0810";
/// Intermediate progress message (card prompt, PIN prompt, processing).
pub const INTERMEDIATE: &str = "0900";
/// Cancel (void) request.
pub const CANCEL: &str = "1200";
/// Cancel response.
pub const CANCEL_RESPONSE: &str = "1210";
/// Initialization request. Answered by a bare ACK.
pub const INITIALIZATION: &str = "0070";
/// Initialization-result request.
pub const INITIALIZATION_RESPONSE: &str = "0080";
/// Initialization-result response.
pub const INITIALIZATION_RESPONSE_RESULT: &str = "1080";

/// Secondary code of an intermediate (`0900`) message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntermediateCode {
    UseCard,
    WritePin,
    ProcessingPayment,
}

impl IntermediateCode {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "80" => Some(Self::UseCard),
            "81" => Some(Self::WritePin),
            "82" => Some(Self::ProcessingPayment),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::UseCard => "80",
            Self::WritePin => "81",
            Self::ProcessingPayment => "82",
        }
    }
}

/// Two-digit response code reported by the terminal.
///
/// `00`..`15` are the transaction outcomes; `90`..`92` report the result of
/// an initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResponseCode {
    #[serde(rename = "00")]
    Approved,
    #[serde(rename = "01")]
    Rejected,
    #[serde(rename = "02")]
    NoResponseFromProcessor,
    #[serde(rename = "03")]
    ConnectionFailed,
    #[serde(rename = "04")]
    TransactionCancelled,
    #[serde(rename = "05")]
    TransactionNotFound,
    #[serde(rename = "06")]
    UnsupportedCard,
    #[serde(rename = "07")]
    CancelledTransaction,
    #[serde(rename = "08")]
    CannotCancel,
    #[serde(rename = "09")]
    CardReadError,
    #[serde(rename = "10")]
    AmountTooLow,
    #[serde(rename = "11")]
    PaymentNotFound,
    #[serde(rename = "12")]
    UnsupportedTransactionType,
    #[serde(rename = "13")]
    MustCloseFirst,
    #[serde(rename = "14")]
    PanEncryptionError,
    #[serde(rename = "15")]
    DebitOperationError,
    #[serde(rename = "90")]
    InitializationOk,
    #[serde(rename = "91")]
    InitializationError,
    #[serde(rename = "92")]
    NotInitialized,
}

const RESPONSE_CODES: [(ResponseCode, &str, &str); 19] = [
    (ResponseCode::Approved, "00", "approved"),
    (ResponseCode::Rejected, "01", "rejected"),
    (
        ResponseCode::NoResponseFromProcessor,
        "02",
        "no-response-from-processor",
    ),
    (ResponseCode::ConnectionFailed, "03", "connection-failed"),
    (
        ResponseCode::TransactionCancelled,
        "04",
        "transaction-cancelled",
    ),
    (
        ResponseCode::TransactionNotFound,
        "05",
        "transaction-not-found",
    ),
    (ResponseCode::UnsupportedCard, "06", "unsupported-card"),
    (
        ResponseCode::CancelledTransaction,
        "07",
        "cancelled-transaction",
    ),
    (ResponseCode::CannotCancel, "08", "cannot-cancel"),
    (ResponseCode::CardReadError, "09", "card-read-error"),
    (ResponseCode::AmountTooLow, "10", "amount-too-low"),
    (ResponseCode::PaymentNotFound, "11", "payment-not-found"),
    (
        ResponseCode::UnsupportedTransactionType,
        "12",
        "unsupported-transaction-type",
    ),
    (ResponseCode::MustCloseFirst, "13", "must-close-first"),
    (ResponseCode::PanEncryptionError, "14", "pan-encryption-error"),
    (
        ResponseCode::DebitOperationError,
        "15",
        "debit-operation-error",
    ),
    (ResponseCode::InitializationOk, "90", "initialization-ok"),
    (
        ResponseCode::InitializationError,
        "91",
        "initialization-error",
    ),
    (ResponseCode::NotInitialized, "92", "not-initialized"),
];

impl ResponseCode {
    /// Parse a two-digit wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        RESPONSE_CODES
            .iter()
            .find(|(_, wire, _)| *wire == code)
            .map(|(response, _, _)| *response)
    }

    /// The two-digit wire code.
    pub fn code(self) -> &'static str {
        self.entry().1
    }

    /// Stable kebab-case name of the outcome.
    pub fn kind(self) -> &'static str {
        self.entry().2
    }

    pub fn is_approved(self) -> bool {
        self == Self::Approved
    }

    /// True for the fifteen transaction failure codes `01`..`15`.
    pub fn is_transaction_error(self) -> bool {
        !self.is_approved() && !self.is_initialization_result()
    }

    /// True for `90`..`92`.
    pub fn is_initialization_result(self) -> bool {
        matches!(
            self,
            Self::InitializationOk | Self::InitializationError | Self::NotInitialized
        )
    }

    fn entry(self) -> &'static (ResponseCode, &'static str, &'static str) {
        // Every variant has exactly one row.
        RESPONSE_CODES
            .iter()
            .find(|(response, _, _)| *response == self)
            .unwrap_or(&RESPONSE_CODES[0])
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.kind())
    }
}
