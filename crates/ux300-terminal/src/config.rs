use std::time::Duration;

use serde::{Deserialize, Deserializer};
use ux300_frame::{ChecksumPolicy, FrameConfig, DEFAULT_MAX_FRAME_LEN};

use crate::transaction::VOUCHER_LINE_WIDTH;

const DEFAULT_EVENT_CAPACITY: usize = 64;
const DEFAULT_WRITE_QUEUE: usize = 32;

/// Driver settings.
///
/// Deserializes from a partial JSON object; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Trailing LRC handling on inbound frames. Default: ignore.
    pub checksum: ChecksumPolicy,
    /// Maximum inbound frame body in bytes.
    pub max_frame_len: usize,
    /// How long a handshake command waits for its ACK. `None` waits forever.
    #[serde(rename = "handshake_timeout_ms", deserialize_with = "millis")]
    pub handshake_timeout: Option<Duration>,
    /// Reconnect through the connector when a command finds the link closed.
    pub auto_reopen: bool,
    /// Buffered events per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
    /// Queued writes before senders wait.
    pub write_queue: usize,
    /// Characters per voucher line.
    pub voucher_line_width: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            checksum: ChecksumPolicy::Ignore,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            handshake_timeout: None,
            auto_reopen: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            write_queue: DEFAULT_WRITE_QUEUE,
            voucher_line_width: VOUCHER_LINE_WIDTH,
        }
    }
}

impl TerminalConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumPolicy) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_auto_reopen(mut self, auto_reopen: bool) -> Self {
        self.auto_reopen = auto_reopen;
        self
    }

    /// Assembler settings for a new link.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_len: self.max_frame_len,
            checksum: self.checksum,
        }
    }

    /// Clamp zero-valued sizes that would make channels or buffers unusable.
    pub(crate) fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_frame_len == 0 {
            self.max_frame_len = defaults.max_frame_len;
        }
        if self.event_capacity == 0 {
            self.event_capacity = defaults.event_capacity;
        }
        if self.write_queue == 0 {
            self.write_queue = defaults.write_queue;
        }
        if self.voucher_line_width == 0 {
            self.voucher_line_width = defaults.voucher_line_width;
        }
        self
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}
