use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Truncated packet: needed {needed} bytes, {remaining} remaining")]
    TruncatedPacket { needed: usize, remaining: usize },

    #[error("Malformed length: {0}")]
    MalformedLength(String),

    #[error("Malformed tile grid: {0}")]
    MalformedTileGrid(String),

    #[error("Packet too large: {size} bytes exceeds maximum of {max}")]
    PacketTooLarge { size: usize, max: usize },

    #[error("Invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Packet type {packet_type} left {remaining} unconsumed body bytes")]
    UnconsumedBytes { packet_type: u8, remaining: usize },

    #[error("Packet type {packet_type} cannot be received by the {side} side")]
    UnexpectedDirection { packet_type: u8, side: &'static str },

    #[error("Slot index {index} out of range for container of length {len}")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    pub(crate) fn truncated(needed: usize, remaining: usize) -> Self {
        CodecError::TruncatedPacket { needed, remaining }
    }

    /// True for errors raised while reading bytes off the wire.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            CodecError::TruncatedPacket { .. }
                | CodecError::MalformedLength(_)
                | CodecError::MalformedTileGrid(_)
                | CodecError::InvalidUtf8(_)
                | CodecError::UnconsumedBytes { .. }
                | CodecError::UnexpectedDirection { .. }
                | CodecError::InvalidValue(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::truncated(4, 1);
        assert_eq!(err.to_string(), "Truncated packet: needed 4 bytes, 1 remaining");

        let err = CodecError::PacketTooLarge { size: 70000, max: 65535 };
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn test_decode_error_classification() {
        assert!(CodecError::truncated(1, 0).is_decode_error());
        assert!(CodecError::MalformedTileGrid("bad run".into()).is_decode_error());
        assert!(!CodecError::PacketTooLarge { size: 1, max: 0 }.is_decode_error());
        assert!(!CodecError::SlotOutOfRange { index: 9, len: 4 }.is_decode_error());
    }
}
