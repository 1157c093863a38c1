use tokio::time::{timeout_at, Instant};
use ux300_terminal::Terminal;
use ux300_transport::Connector;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{terminal_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_ack, print_event, OutputFormat};

pub async fn run<C: Connector>(
    terminal: &Terminal<C>,
    args: SendArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    if args.code.len() != 4 || !args.code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CliError::new(
            USAGE,
            format!("message type must be four digits: {}", args.code),
        ));
    }
    let window = args.wait.as_deref().map(parse_duration).transpose()?;
    let mut events = terminal.subscribe();

    terminal
        .send_raw(&args.code, &args.fields)
        .await
        .map_err(|err| terminal_error("send failed", err))?;
    print_ack(&args.code, format);

    if let Some(window) = window {
        let deadline = Instant::now() + window;
        while let Ok(Ok(event)) = timeout_at(deadline, events.recv()).await {
            print_event(&event, format);
        }
    }
    Ok(SUCCESS)
}

pub async fn load_keys<C: Connector>(
    terminal: &Terminal<C>,
    format: OutputFormat,
) -> CliResult<i32> {
    terminal
        .load_keys()
        .await
        .map_err(|err| terminal_error("load-keys failed", err))?;
    print_ack("load-keys", format);
    Ok(SUCCESS)
}
