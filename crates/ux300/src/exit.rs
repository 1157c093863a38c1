use std::fmt;
use std::io;

use ux300_terminal::TerminalError;
use ux300_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// The terminal answered with a failure response code.
pub const DECLINED: i32 = 20;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotFound
        | io::ErrorKind::NotConnected => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn terminal_error(context: &str, err: TerminalError) -> CliError {
    match err {
        TerminalError::Transport(err) => transport_error(context, err),
        TerminalError::Io(source) => io_error(context, source),
        TerminalError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TerminalError::InvalidField(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        TerminalError::NotOpen | TerminalError::Closed => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TerminalError::HandshakeInFlight(_) => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ux300_terminal::HandshakeKind;

    use super::*;

    #[test]
    fn terminal_errors_map_to_exit_codes() {
        let cases = [
            (TerminalError::Timeout(Duration::from_secs(1)), TIMEOUT),
            (TerminalError::InvalidField("a|b".to_string()), DATA_INVALID),
            (TerminalError::NotOpen, TRANSPORT_ERROR),
            (TerminalError::Closed, TRANSPORT_ERROR),
            (
                TerminalError::HandshakeInFlight(HandshakeKind::Polling),
                FAILURE,
            ),
            (
                TerminalError::Transport(TransportError::InvalidConfig("baud".to_string())),
                USAGE,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(terminal_error("ctx", err).code, code);
        }
    }

    #[test]
    fn open_failures_are_transport_errors_unless_denied() {
        let missing = TransportError::Open {
            port: "/dev/ttyX".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
        };
        assert_eq!(transport_error("open", missing).code, TRANSPORT_ERROR);

        let denied = TransportError::Open {
            port: "/dev/ttyX".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let err = transport_error("open", denied);
        assert_eq!(err.code, PERMISSION_DENIED);
        assert!(err.message.starts_with("open: "));
    }
}
