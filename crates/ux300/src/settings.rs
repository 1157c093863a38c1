use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Deserialize;
use ux300_frame::ChecksumPolicy;
use ux300_terminal::TerminalConfig;
use ux300_transport::SerialConfig;

use crate::cmd::parse_duration;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

/// Connection options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Serial device of the terminal, e.g. /dev/ttyACM0 or COM3.
    #[arg(long, env = "UX300_PORT", global = true)]
    pub port: Option<String>,

    /// Line speed.
    #[arg(long, env = "UX300_BAUD", global = true)]
    pub baud: Option<u32>,

    /// JSON file with `serial` and `terminal` sections.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Inbound checksum handling.
    #[arg(long, value_name = "POLICY", global = true)]
    pub checksum: Option<ChecksumArg>,

    /// How long poll/init wait for the ACK (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", global = true)]
    pub handshake_timeout: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChecksumArg {
    Ignore,
    Warn,
    Reject,
}

impl From<ChecksumArg> for ChecksumPolicy {
    fn from(arg: ChecksumArg) -> Self {
        match arg {
            ChecksumArg::Ignore => ChecksumPolicy::Ignore,
            ChecksumArg::Warn => ChecksumPolicy::Warn,
            ChecksumArg::Reject => ChecksumPolicy::Reject,
        }
    }
}

/// Effective settings: file values overridden by flags and environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialConfig,
    pub terminal: TerminalConfig,
}

impl Settings {
    pub fn resolve(args: &ConnectionArgs) -> CliResult<Self> {
        let mut settings = match &args.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| {
                    io_error(&format!("failed reading {}", path.display()), err)
                })?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };

        if let Some(port) = &args.port {
            settings.serial.port = port.clone();
        }
        if let Some(baud) = args.baud {
            settings.serial.baud_rate = baud;
        }
        if let Some(checksum) = args.checksum {
            settings.terminal.checksum = checksum.into();
        }
        if let Some(timeout) = &args.handshake_timeout {
            settings.terminal.handshake_timeout = Some(parse_duration(timeout)?);
        }

        if settings.serial.port.trim().is_empty() {
            return Err(CliError::new(
                USAGE,
                "no serial port: pass --port or set UX300_PORT",
            ));
        }
        Ok(settings)
    }

    fn from_json(text: &str) -> CliResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid config file: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn flags_without_file() {
        let args = ConnectionArgs {
            port: Some("/dev/ttyACM0".to_string()),
            checksum: Some(ChecksumArg::Warn),
            handshake_timeout: Some("750ms".to_string()),
            ..ConnectionArgs::default()
        };
        let settings = Settings::resolve(&args).unwrap();
        assert_eq!(settings.serial.port, "/dev/ttyACM0");
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.terminal.checksum, ChecksumPolicy::Warn);
        assert_eq!(
            settings.terminal.handshake_timeout,
            Some(Duration::from_millis(750))
        );
    }

    #[test]
    fn missing_port_is_a_usage_error() {
        let err = Settings::resolve(&ConnectionArgs::default()).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn file_values_are_overridden_by_flags() {
        let path = std::env::temp_dir().join(format!("ux300-settings-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{
                "serial": {"port": "/dev/ttyS1", "baud_rate": 9600},
                "terminal": {"checksum": "reject", "auto_reopen": false}
            }"#,
        )
        .unwrap();

        let args = ConnectionArgs {
            config: Some(path.clone()),
            baud: Some(57_600),
            ..ConnectionArgs::default()
        };
        let settings = Settings::resolve(&args).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(settings.serial.port, "/dev/ttyS1");
        assert_eq!(settings.serial.baud_rate, 57_600);
        assert_eq!(settings.terminal.checksum, ChecksumPolicy::Reject);
        assert!(!settings.terminal.auto_reopen);
    }

    #[test]
    fn malformed_file_is_data_invalid() {
        let err = Settings::from_json("{\"serial\": 3}").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
