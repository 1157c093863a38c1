use ux300_terminal::Terminal;
use ux300_transport::Connector;

use crate::exit::{terminal_error, CliResult, SUCCESS};
use crate::output::{print_ack, OutputFormat};

pub async fn poll<C: Connector>(terminal: &Terminal<C>, format: OutputFormat) -> CliResult<i32> {
    terminal
        .poll()
        .await
        .map_err(|err| terminal_error("poll failed", err))?;
    print_ack("poll", format);
    Ok(SUCCESS)
}

pub async fn init<C: Connector>(terminal: &Terminal<C>, format: OutputFormat) -> CliResult<i32> {
    terminal
        .initialize()
        .await
        .map_err(|err| terminal_error("init failed", err))?;
    print_ack("init", format);
    Ok(SUCCESS)
}
