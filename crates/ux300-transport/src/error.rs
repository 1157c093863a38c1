/// Errors that can occur in terminal transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: std::io::Error,
    },

    /// The serial configuration cannot be applied.
    #[error("invalid serial configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connector has no stream left to hand out.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
