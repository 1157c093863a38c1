use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use ux300_terminal::Terminal;
use ux300_transport::Connector;

use crate::cmd::ListenArgs;
use crate::exit::{terminal_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub async fn run<C: Connector>(
    terminal: &Terminal<C>,
    args: ListenArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut events = terminal.subscribe();
    terminal
        .open()
        .await
        .map_err(|err| terminal_error("open failed", err))?;
    info!("listening for terminal events");

    let mut printed = 0usize;
    loop {
        let event = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|err| {
                    CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
                })?;
                return Ok(SUCCESS);
            }
            received = events.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => return Ok(SUCCESS),
            },
        };

        print_event(&event, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }
}
