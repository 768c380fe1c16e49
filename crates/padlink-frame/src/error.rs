/// Errors that can occur while decoding an inbound frame.
///
/// Every variant is recoverable: the frame is dropped and nothing is applied.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the smallest possible frame.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// The start or end marker does not match the configured markers.
    #[error("frame marker mismatch")]
    BadMarker,

    /// The declared payload length disagrees with the bytes received.
    #[error("declared payload length {declared} does not match {actual} bytes received")]
    LengthMismatch { declared: usize, actual: usize },

    /// A byte between the markers has bit 7 set.
    #[error("byte 0x{byte:02X} at offset {offset} is not 7-bit clean")]
    InvalidByte { offset: usize, byte: u8 },

    /// The checksum byte does not match the frame contents.
    #[error("checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// An I/O error occurred while reading frames from a stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame arrived.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

/// Reasons an outbound frame is refused at encode time.
///
/// A rejected frame is never sent partially or truncated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeRejected {
    /// Command ids must be 7-bit.
    #[error("command 0x{0:02X} is not 7-bit clean")]
    CommandOutOfRange(u8),

    /// A payload byte is outside 0..=127.
    #[error("payload byte 0x{byte:02X} at offset {offset} is not 7-bit clean")]
    PayloadByteOutOfRange { offset: usize, byte: u8 },

    /// The encoded frame would exceed the configured maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Invalid [`FrameConfig`](crate::FrameConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameConfigError {
    /// Markers must use bytes with bit 7 set so they never collide with frame bodies.
    #[error("marker byte 0x{0:02X} must be >= 0x80")]
    MarkerNotReserved(u8),

    /// Start and end markers must differ.
    #[error("start and end markers share byte 0x{0:02X}")]
    MarkerCollision(u8),

    /// Maximum frame size outside what the header can describe.
    #[error("max frame size {size} outside {min}..={max}")]
    MaxFrameSizeOutOfRange { size: usize, min: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
