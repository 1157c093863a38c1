mod cmd;
mod exit;
mod logging;
mod output;
mod settings;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;
use crate::settings::ConnectionArgs;

#[derive(Parser, Debug)]
#[command(name = "ux300", version, about = "UX300 payment terminal CLI")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        env = "UX300_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        env = "UX300_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.connection, format).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ChecksumArg;

    #[test]
    fn parses_pay_subcommand() {
        let cli = Cli::try_parse_from([
            "ux300",
            "--port",
            "/dev/ttyACM0",
            "pay",
            "--amount",
            "1500",
            "--ticket",
            "T-0042",
        ])
        .expect("pay args should parse");

        assert_eq!(cli.connection.port.as_deref(), Some("/dev/ttyACM0"));
        match cli.command {
            Command::Pay(args) => {
                assert_eq!(args.amount, 1500);
                assert_eq!(args.ticket, "T-0042");
                assert_eq!(args.outcome.timeout, "120s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "ux300",
            "poll",
            "--port",
            "COM3",
            "--baud",
            "9600",
            "--checksum",
            "reject",
            "--handshake-timeout",
            "2s",
            "--format",
            "json",
        ])
        .expect("global args should parse after the subcommand");

        assert!(matches!(cli.command, Command::Poll));
        assert_eq!(cli.connection.baud, Some(9600));
        assert_eq!(cli.connection.checksum, Some(ChecksumArg::Reject));
        assert_eq!(cli.connection.handshake_timeout.as_deref(), Some("2s"));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn pay_requires_amount() {
        let err = Cli::try_parse_from(["ux300", "pay", "--ticket", "T1"])
            .expect_err("missing amount should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_raw_send_fields() {
        let cli = Cli::try_parse_from(["ux300", "send", "0250", "1", "--wait", "3s"])
            .expect("send args should parse");
        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.code, "0250");
                assert_eq!(args.fields, ["1"]);
                assert_eq!(args.wait.as_deref(), Some("3s"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_checksum_policy() {
        let err = Cli::try_parse_from(["ux300", "--checksum", "strict", "poll"])
            .expect_err("unknown policy should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
