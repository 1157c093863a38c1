use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, TransportError};

/// Source of connected byte streams for a terminal link.
///
/// The driver calls [`Connector::connect`] on open and again whenever the
/// automatic reconnect policy decides to re-open a closed link.
pub trait Connector: Send + Sync + 'static {
    /// The duplex stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a new stream.
    fn connect(&self) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Human-readable endpoint description used in logs.
    fn describe(&self) -> String;
}

/// Connector over already-open streams.
///
/// Each call to `connect` takes the next queued stream. Once the queue is
/// drained, `connect` fails with [`TransportError::Closed`].
pub struct StreamConnector<S> {
    streams: Mutex<VecDeque<S>>,
    label: String,
}

impl<S> StreamConnector<S> {
    /// Wrap a single pre-opened stream.
    pub fn new(stream: S) -> Self {
        Self::with_streams([stream])
    }

    /// Queue several streams, handed out in order.
    pub fn with_streams(streams: impl IntoIterator<Item = S>) -> Self {
        Self {
            streams: Mutex::new(streams.into_iter().collect()),
            label: "stream".to_string(),
        }
    }

    /// Override the endpoint label used in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Number of streams not yet handed out.
    pub fn remaining(&self) -> usize {
        self.streams.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn take(&self) -> Option<S> {
        self.streams.lock().ok()?.pop_front()
    }
}

impl<S> Connector for StreamConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = S;

    async fn connect(&self) -> Result<S> {
        self.take().ok_or(TransportError::Closed)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
