use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};
use ux300_terminal::{Terminal, TerminalEvent};
use ux300_transport::Connector;

use crate::cmd::{parse_duration, OutcomeArgs};
use crate::exit::{
    terminal_error, CliError, CliResult, DECLINED, INTERNAL, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
};
use crate::output::{print_event, OutputFormat};

/// A command whose result arrives later as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Sale { amount: u64, ticket: String },
    Close,
    LastSale,
    Cancel,
    InitializationResult,
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Self::Sale { .. } => "pay",
            Self::Close => "close",
            Self::LastSale => "last",
            Self::Cancel => "cancel",
            Self::InitializationResult => "init-response",
        }
    }

    /// Exit code if `event` settles this request.
    pub fn exit_code(&self, event: &TerminalEvent) -> Option<i32> {
        match (self, event) {
            (_, TerminalEvent::TransportError { .. }) => Some(TRANSPORT_ERROR),
            (_, TerminalEvent::Error { .. }) => Some(DECLINED),
            (Self::Sale { .. }, TerminalEvent::PaymentVoucher { .. }) => Some(SUCCESS),
            (Self::Close, TerminalEvent::TransactionsClose { .. }) => Some(SUCCESS),
            (Self::LastSale, TerminalEvent::LastPaymentResponse { response_code, .. })
            | (Self::Cancel, TerminalEvent::CanceledTransaction { response_code }) => {
                Some(approved(response_code == "00"))
            }
            (
                Self::InitializationResult,
                TerminalEvent::InitializationResponseResponse { fields },
            ) => Some(approved(fields.first().is_some_and(|code| code == "90"))),
            _ => None,
        }
    }

    async fn send<C: Connector>(&self, terminal: &Terminal<C>) -> ux300_terminal::Result<()> {
        match self {
            Self::Sale { amount, ticket } => terminal.pay(*amount, ticket).await,
            Self::Close => terminal.close_transactions().await,
            Self::LastSale => terminal.last_transaction().await,
            Self::Cancel => terminal.cancel_transaction().await,
            Self::InitializationResult => terminal.initialization_response().await,
        }
    }
}

fn approved(ok: bool) -> i32 {
    if ok {
        SUCCESS
    } else {
        DECLINED
    }
}

pub async fn run<C: Connector>(
    terminal: &Terminal<C>,
    request: Request,
    args: &OutcomeArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let limit = parse_duration(&args.timeout)?;
    let mut events = terminal.subscribe();

    request
        .send(terminal)
        .await
        .map_err(|err| terminal_error(&format!("{} failed", request.name()), err))?;
    info!(command = request.name(), "waiting for terminal");

    wait_for_outcome(&mut events, &request, limit, format).await
}

async fn wait_for_outcome(
    events: &mut broadcast::Receiver<TerminalEvent>,
    request: &Request,
    limit: std::time::Duration,
    format: OutputFormat,
) -> CliResult<i32> {
    let deadline = Instant::now() + limit;
    loop {
        let event = match timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) => event,
            Ok(Err(RecvError::Lagged(missed))) => {
                warn!(missed, "event stream lagged");
                continue;
            }
            Ok(Err(RecvError::Closed)) => {
                return Err(CliError::new(INTERNAL, "event stream closed"));
            }
            Err(_) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("{}: no answer within {limit:?}", request.name()),
                ));
            }
        };

        print_event(&event, format);
        if let Some(code) = request.exit_code(&event) {
            return Ok(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ux300_terminal::{EventBus, ResponseCode};

    use super::*;

    fn sale() -> Request {
        Request::Sale {
            amount: 1000,
            ticket: "T1".to_string(),
        }
    }

    #[test]
    fn progress_events_do_not_settle_a_sale() {
        for event in [
            TerminalEvent::UseCard,
            TerminalEvent::WritePin,
            TerminalEvent::ProcessingPayment,
            TerminalEvent::PollingResponse,
        ] {
            assert_eq!(sale().exit_code(&event), None);
        }
    }

    #[test]
    fn failures_settle_every_request() {
        let declined = TerminalEvent::error(ResponseCode::Rejected);
        let broken = TerminalEvent::TransportError {
            message: "eof".to_string(),
        };
        for request in [
            sale(),
            Request::Close,
            Request::LastSale,
            Request::Cancel,
            Request::InitializationResult,
        ] {
            assert_eq!(request.exit_code(&declined), Some(DECLINED));
            assert_eq!(request.exit_code(&broken), Some(TRANSPORT_ERROR));
        }
    }

    #[test]
    fn response_codes_decide_cancel_and_reprint() {
        let cancelled = |code: &str| TerminalEvent::CanceledTransaction {
            response_code: code.to_string(),
        };
        assert_eq!(Request::Cancel.exit_code(&cancelled("00")), Some(SUCCESS));
        assert_eq!(Request::Cancel.exit_code(&cancelled("08")), Some(DECLINED));
        assert_eq!(Request::LastSale.exit_code(&cancelled("00")), None);

        let init = |code: &str| TerminalEvent::InitializationResponseResponse {
            fields: vec![code.to_string()],
        };
        assert_eq!(
            Request::InitializationResult.exit_code(&init("90")),
            Some(SUCCESS)
        );
        assert_eq!(
            Request::InitializationResult.exit_code(&init("92")),
            Some(DECLINED)
        );
    }

    #[tokio::test]
    async fn waits_past_progress_events() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        bus.emit(TerminalEvent::UseCard);
        bus.emit(TerminalEvent::TransactionsClose { report: Vec::new() });

        let code = wait_for_outcome(
            &mut events,
            &Request::Close,
            Duration::from_secs(1),
            OutputFormat::Json,
        )
        .await
        .unwrap();
        assert_eq!(code, SUCCESS);
    }

    #[tokio::test]
    async fn gives_up_after_the_deadline() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let err = wait_for_outcome(
            &mut events,
            &sale(),
            Duration::from_millis(20),
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }
}
