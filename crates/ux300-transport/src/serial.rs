use serde::Deserialize;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::connector::Connector;
use crate::error::{Result, TransportError};

/// Line speed used by UX300 terminals out of the box.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial parity configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Serial flow control configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    pub baud_rate: u32,
    /// 5, 6, 7 or 8.
    pub data_bits: u8,
    pub parity: Parity,
    /// 1 or 2.
    pub stop_bits: u8,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Settings for `port` with the terminal defaults (115200 8N1).
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Check the settings without touching the device.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "serial port must not be empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(TransportError::InvalidConfig(
                "baud rate must be greater than zero".to_string(),
            ));
        }
        data_bits(self.data_bits)?;
        stop_bits(self.stop_bits)?;
        Ok(())
    }
}

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(TransportError::InvalidConfig(format!(
            "unsupported data bits: {other}"
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        other => Err(TransportError::InvalidConfig(format!(
            "unsupported stop bits: {other}"
        ))),
    }
}

/// Opens the terminal's serial line.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Connector for SerialConnector {
    type Stream = SerialStream;

    async fn connect(&self) -> Result<SerialStream> {
        self.config.validate()?;
        let cfg = &self.config;
        debug!(port = %cfg.port, baud = cfg.baud_rate, "opening serial port");

        let stream = tokio_serial::new(&cfg.port, cfg.baud_rate)
            .data_bits(data_bits(cfg.data_bits)?)
            .stop_bits(stop_bits(cfg.stop_bits)?)
            .parity(cfg.parity.into())
            .flow_control(cfg.flow_control.into())
            .open_native_async()
            .map_err(|err| TransportError::Open {
                port: cfg.port.clone(),
                source: err.into(),
            })?;

        info!(port = %cfg.port, baud = cfg.baud_rate, "serial port opened");
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.config.port, self.config.baud_rate)
    }
}
