//! Wire-level byte constants.

/// Start of a frame.
pub const STX: u8 = 0x02;

/// End of a frame. Followed by the LRC byte.
pub const ETX: u8 = 0x03;

/// Field separator (`|`).
pub const SEP: u8 = 0x7C;

/// Positive acknowledgement.
pub const ACK: u8 = 0x06;

/// Negative acknowledgement.
pub const NAK: u8 = 0x15;

/// A bare control byte exchanged outside of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    Ack,
    Nak,
}

impl ControlSignal {
    /// Classify a byte as a control signal.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ACK => Some(Self::Ack),
            NAK => Some(Self::Nak),
            _ => None,
        }
    }

    /// The wire byte for this signal.
    pub fn byte(self) -> u8 {
        match self {
            Self::Ack => ACK,
            Self::Nak => NAK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ack => "ACK",
            Self::Nak => "NAK",
        }
    }
}

/// Returns true for bytes that cannot appear inside a field.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, STX | ETX | SEP | ACK | NAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_signal_roundtrips_through_byte() {
        for signal in [ControlSignal::Ack, ControlSignal::Nak] {
            assert_eq!(ControlSignal::from_byte(signal.byte()), Some(signal));
        }
        assert_eq!(ControlSignal::from_byte(STX), None);
        assert_eq!(ControlSignal::from_byte(b'0'), None);
    }

    #[test]
    fn reserved_bytes() {
        assert!(is_reserved(b'|'));
        assert!(is_reserved(STX));
        assert!(is_reserved(ETX));
        assert!(!is_reserved(b'A'));
        assert!(!is_reserved(b' '));
    }
}
