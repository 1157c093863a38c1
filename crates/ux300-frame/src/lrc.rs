//! Longitudinal redundancy check.
//!
//! The terminal checksums `body || ETX`, never the body alone.

use crate::wire::ETX;

/// XOR of every byte in `body`, then `ETX`.
pub fn compute(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |lrc, byte| lrc ^ byte) ^ ETX
}

/// Returns true when `lrc` is the checksum of `body`.
pub fn verify(body: &[u8], lrc: u8) -> bool {
    compute(body) == lrc
}
