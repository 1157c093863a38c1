/// Errors that can occur while assembling frames.
///
/// The assembler never propagates these out of [`crate::FrameAssembler::push`];
/// they describe why a frame was flagged or dropped and end up in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The trailing LRC byte does not match the payload.
    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The accumulated frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
