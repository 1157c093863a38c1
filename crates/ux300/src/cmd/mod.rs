use std::time::Duration;

use clap::{Args, Subcommand};
use ux300_terminal::Terminal;
use ux300_transport::SerialConnector;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;
use crate::settings::{ConnectionArgs, Settings};

pub mod handshake;
pub mod listen;
pub mod outcome;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the terminal and wait for its ACK.
    Poll,
    /// Request initialization and wait for its ACK.
    Init,
    /// Ask for the result of the last initialization.
    InitResponse(OutcomeArgs),
    /// Start a sale and wait for its outcome.
    Pay(PayArgs),
    /// Close (settle) the day's transactions.
    Close(OutcomeArgs),
    /// Reprint the last sale.
    Last(OutcomeArgs),
    /// Cancel the last sale.
    Cancel(OutcomeArgs),
    /// Ask the terminal to load its keys.
    LoadKeys,
    /// Send an arbitrary message.
    Send(SendArgs),
    /// Print terminal events as they arrive.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(
    command: Command,
    connection: &ConnectionArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    if let Command::Version(args) = command {
        return version::run(args);
    }

    let settings = Settings::resolve(connection)?;
    let terminal = Terminal::new(SerialConnector::new(settings.serial), settings.terminal);

    let result = match command {
        Command::Poll => handshake::poll(&terminal, format).await,
        Command::Init => handshake::init(&terminal, format).await,
        Command::InitResponse(args) => {
            outcome::run(&terminal, outcome::Request::InitializationResult, &args, format).await
        }
        Command::Pay(args) => {
            let request = outcome::Request::Sale {
                amount: args.amount,
                ticket: args.ticket,
            };
            outcome::run(&terminal, request, &args.outcome, format).await
        }
        Command::Close(args) => {
            outcome::run(&terminal, outcome::Request::Close, &args, format).await
        }
        Command::Last(args) => {
            outcome::run(&terminal, outcome::Request::LastSale, &args, format).await
        }
        Command::Cancel(args) => {
            outcome::run(&terminal, outcome::Request::Cancel, &args, format).await
        }
        Command::LoadKeys => send::load_keys(&terminal, format).await,
        Command::Send(args) => send::run(&terminal, args, format).await,
        Command::Listen(args) => listen::run(&terminal, args, format).await,
        Command::Version(args) => version::run(args),
    };

    terminal.close().await;
    result
}

#[derive(Args, Debug)]
pub struct OutcomeArgs {
    /// Give up waiting for the terminal's answer after this long (e.g. 90s).
    #[arg(long, default_value = "120s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct PayArgs {
    /// Amount in the smallest currency unit.
    #[arg(long)]
    pub amount: u64,
    /// Ticket number printed on the voucher.
    #[arg(long)]
    pub ticket: String,
    #[command(flatten)]
    pub outcome: OutcomeArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Four-digit message type code.
    pub code: String,
    /// Message fields after the type code.
    pub fields: Vec<String>,
    /// Print events received during this window after sending (e.g. 5s).
    #[arg(long)]
    pub wait: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
