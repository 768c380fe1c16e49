use std::fmt::Write as _;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{EncodeRejected, FrameConfigError, FrameError, Result};
use crate::value::{pack14, unpack14, MAX_14BIT};

/// Start marker (4) + command + sequence + length high + length low.
pub const HEADER_SIZE: usize = 8;

/// Checksum + end marker.
pub const TRAILER_SIZE: usize = 2;

/// Smallest possible frame: header and trailer around an empty payload.
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// Largest payload the 14-bit length field can describe.
pub const MAX_PAYLOAD_LEN: usize = MAX_14BIT as usize;

/// Universal non-commercial SysEx header.
pub const DEFAULT_START_MARKER: [u8; 4] = [0xF0, 0x7F, 0x00, 0x7F];

/// SysEx end byte.
pub const DEFAULT_END_MARKER: u8 = 0xF7;

/// Default ceiling for a complete encoded frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

const SEVEN_BITS: u8 = 0x7F;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command id (0..=127).
    pub command: u8,
    /// Diagnostic sequence number (0..=127, wrapping).
    pub sequence: u8,
    /// Payload bytes, each 0..=127.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: u8, sequence: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            sequence,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (markers, header, payload, checksum).
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_SIZE + self.payload.len()
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Bytes opening every frame. The first byte must be >= 0x80.
    pub start_marker: [u8; 4],
    /// Byte closing every frame. Must be >= 0x80.
    pub end_marker: u8,
    /// Largest complete frame accepted at encode time, bounded by the
    /// transport's message-size ceiling.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER,
            end_marker: DEFAULT_END_MARKER,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl FrameConfig {
    /// Check that the markers can delimit 7-bit frame bodies and that the
    /// size ceiling fits the length field.
    pub fn validate(&self) -> std::result::Result<(), FrameConfigError> {
        if self.start_marker[0] <= SEVEN_BITS {
            return Err(FrameConfigError::MarkerNotReserved(self.start_marker[0]));
        }
        if self.end_marker <= SEVEN_BITS {
            return Err(FrameConfigError::MarkerNotReserved(self.end_marker));
        }
        if self.start_marker[0] == self.end_marker {
            return Err(FrameConfigError::MarkerCollision(self.end_marker));
        }
        let max = MIN_FRAME_SIZE + MAX_PAYLOAD_LEN;
        if !(MIN_FRAME_SIZE..=max).contains(&self.max_frame_size) {
            return Err(FrameConfigError::MaxFrameSizeOutOfRange {
                size: self.max_frame_size,
                min: MIN_FRAME_SIZE,
                max,
            });
        }
        Ok(())
    }
}

/// XOR-fold of command, sequence and every payload byte, masked to 7 bits.
pub fn checksum(command: u8, sequence: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(command ^ sequence, |acc, byte| acc ^ byte)
        & SEVEN_BITS
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────┬─────┬────────┬────────┬───────────┬──────────┬─────┐
/// │ Marker (4) │ Cmd │ Seq │ Len hi │ Len lo │ Payload   │ Checksum │ End │
/// │ F0 7F 00 7F│     │     │ 7 bits │ 7 bits │ (Len)     │ 7 bits   │ F7  │
/// └────────────┴─────┴─────┴────────┴────────┴───────────┴──────────┴─────┘
/// ```
///
/// Nothing is written to `dst` when the frame is rejected.
pub fn encode_frame(
    command: u8,
    sequence: u8,
    payload: &[u8],
    config: &FrameConfig,
    dst: &mut BytesMut,
) -> std::result::Result<(), EncodeRejected> {
    if command > SEVEN_BITS {
        return Err(EncodeRejected::CommandOutOfRange(command));
    }
    if let Some((offset, &byte)) = payload.iter().enumerate().find(|(_, b)| **b > SEVEN_BITS) {
        return Err(EncodeRejected::PayloadByteOutOfRange { offset, byte });
    }
    let size = MIN_FRAME_SIZE + payload.len();
    if payload.len() > MAX_PAYLOAD_LEN || size > config.max_frame_size {
        return Err(EncodeRejected::FrameTooLarge {
            size,
            max: config.max_frame_size,
        });
    }

    let sequence = sequence & SEVEN_BITS;
    let (len_hi, len_lo) = pack14(payload.len() as u16);

    dst.reserve(size);
    dst.put_slice(&config.start_marker);
    dst.put_u8(command);
    dst.put_u8(sequence);
    dst.put_u8(len_hi);
    dst.put_u8(len_lo);
    dst.put_slice(payload);
    dst.put_u8(checksum(command, sequence, payload));
    dst.put_u8(config.end_marker);
    Ok(())
}

/// Decode and validate one complete frame.
///
/// Checks run in order: minimum length, start marker, declared length,
/// end marker, 7-bit cleanliness, checksum. The first failure is reported.
pub fn decode(bytes: &[u8], config: &FrameConfig) -> Result<Frame> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(FrameError::TooShort {
            len: bytes.len(),
            min: MIN_FRAME_SIZE,
        });
    }

    if bytes[0..4] != config.start_marker {
        return Err(FrameError::BadMarker);
    }

    // Length bytes are read unmasked so a flipped high bit can never alias
    // a valid length.
    let declared = ((bytes[6] as usize) << 7) | bytes[7] as usize;
    let actual = bytes.len() - MIN_FRAME_SIZE;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    let end = bytes.len() - 1;
    if bytes[end] != config.end_marker {
        return Err(FrameError::BadMarker);
    }

    if let Some((index, &byte)) = bytes[4..end]
        .iter()
        .enumerate()
        .find(|(_, b)| **b > SEVEN_BITS)
    {
        return Err(FrameError::InvalidByte {
            offset: index + 4,
            byte,
        });
    }

    let command = bytes[4];
    let sequence = bytes[5];
    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + declared];
    let expected = checksum(command, sequence, payload);
    let actual = bytes[end - 1];
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame {
        command,
        sequence,
        payload: Bytes::copy_from_slice(payload),
    })
}

/// Split the next marker-delimited candidate frame off a stream buffer.
///
/// Bytes before a start marker are discarded, and a frame interrupted by a
/// new start marker is dropped, so the stream resynchronizes after noise.
/// Returns `None` when more data is needed. The candidate still has to go
/// through [`decode`].
pub fn split_frame(src: &mut BytesMut, config: &FrameConfig) -> Option<BytesMut> {
    let start = config.start_marker[0];
    loop {
        let Some(pos) = src.iter().position(|&b| b == start) else {
            if !src.is_empty() {
                trace!(len = src.len(), "discarding bytes outside a frame");
                src.clear();
            }
            return None;
        };
        if pos > 0 {
            trace!(len = pos, "discarding bytes before start marker");
            src.advance(pos);
        }

        match src[1..]
            .iter()
            .position(|&b| b == config.end_marker || b == start)
        {
            Some(index) if src[index + 1] == config.end_marker => {
                return Some(src.split_to(index + 2));
            }
            Some(index) => {
                debug!(len = index + 1, "dropping frame interrupted by a new start marker");
                src.advance(index + 1);
            }
            None if src.len() > MIN_FRAME_SIZE + MAX_PAYLOAD_LEN => {
                warn!(len = src.len(), "unterminated frame exceeds size ceiling; resyncing");
                src.advance(1);
            }
            None => return None,
        }
    }
}

/// Owns the wrapping sequence counter shared by every outbound command.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    config: FrameConfig,
    next_sequence: u8,
    buf: BytesMut,
}

impl FrameEncoder {
    /// Create an encoder with explicit configuration.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            next_sequence: 0,
            buf: BytesMut::with_capacity(DEFAULT_MAX_FRAME_SIZE),
        }
    }

    /// Encode a frame and stamp it with the next sequence number.
    ///
    /// Only accepted frames consume a sequence number.
    pub fn encode(
        &mut self,
        command: u8,
        payload: &[u8],
    ) -> std::result::Result<Bytes, EncodeRejected> {
        self.buf.clear();
        encode_frame(
            command,
            self.next_sequence,
            payload,
            &self.config,
            &mut self.buf,
        )?;
        self.next_sequence = (self.next_sequence + 1) & SEVEN_BITS;
        Ok(self.buf.split().freeze())
    }

    /// Sequence number the next accepted frame will carry.
    pub fn next_sequence(&self) -> u8 {
        self.next_sequence
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

/// Space-separated uppercase hex, e.g. `F0 7F 00 7F`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Read the declared payload length of a buffer holding at least a header.
pub fn declared_len(header: &[u8]) -> Option<u16> {
    if header.len() < HEADER_SIZE {
        return None;
    }
    Some(unpack14(header[6], header[7]))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn encode_default(command: u8, sequence: u8, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(command, sequence, payload, &FrameConfig::default(), &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_wire_layout() {
        let buf = encode_default(0x21, 5, &[3, 100]);
        assert_eq!(
            buf.as_ref(),
            &[0xF0, 0x7F, 0x00, 0x7F, 0x21, 5, 0, 2, 3, 100, 0x21 ^ 5 ^ 3 ^ 100, 0xF7]
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = b"hello, padlink";
        let buf = encode_default(0x14, 9, payload);

        assert_eq!(buf.len(), MIN_FRAME_SIZE + payload.len());

        let frame = decode(&buf, &FrameConfig::default()).unwrap();
        assert_eq!(frame.command, 0x14);
        assert_eq!(frame.sequence, 9);
        assert_eq!(frame.payload.as_ref(), payload);
        assert_eq!(frame.wire_size(), buf.len());
    }

    #[test]
    fn test_empty_payload() {
        let buf = encode_default(0x60, 0, &[]);
        let frame = decode(&buf, &FrameConfig::default()).unwrap();
        assert_eq!(frame.command, 0x60);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_length_uses_two_seven_bit_bytes() {
        let payload = vec![1u8; 300];
        let cfg = FrameConfig {
            max_frame_size: 4096,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        encode_frame(0x1E, 0, &payload, &cfg, &mut buf).unwrap();

        assert_eq!((buf[6], buf[7]), (2, 44));
        assert_eq!(declared_len(&buf), Some(300));
        assert_eq!(decode(&buf, &cfg).unwrap().payload.len(), 300);
    }

    #[test]
    fn test_rejects_high_payload_byte() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0x10, 0, &[1, 2, 0x80], &FrameConfig::default(), &mut buf)
            .unwrap_err();
        assert_eq!(
            err,
            EncodeRejected::PayloadByteOutOfRange {
                offset: 2,
                byte: 0x80
            }
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rejects_high_command() {
        let mut buf = BytesMut::new();
        let err = encode_frame(0xB0, 0, &[], &FrameConfig::default(), &mut buf).unwrap_err();
        assert_eq!(err, EncodeRejected::CommandOutOfRange(0xB0));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        encode_frame(0x10, 0, &[0; 6], &cfg, &mut buf).unwrap();

        buf.clear();
        let err = encode_frame(0x10, 0, &[0; 7], &cfg, &mut buf).unwrap_err();
        assert_eq!(err, EncodeRejected::FrameTooLarge { size: 17, max: 16 });
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_too_short() {
        let err = decode(&[0xF0, 0x7F, 0x00], &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { len: 3, min: 10 }));
    }

    #[test]
    fn test_decode_bad_start_marker() {
        let mut buf = encode_default(0x10, 0, &[1]);
        buf[1] = 0x7E;
        let err = decode(&buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::BadMarker));
    }

    #[test]
    fn test_decode_bad_end_marker() {
        let mut buf = encode_default(0x10, 0, &[1]);
        let last = buf.len() - 1;
        buf[last] = 0xF8;
        let err = decode(&buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::BadMarker));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let buf = encode_default(0x10, 0, &[1, 2, 3, 4]);
        let mut truncated = buf[..HEADER_SIZE + 2].to_vec();
        truncated.extend_from_slice(&[0, 0xF7]);
        let err = decode(&truncated, &FrameConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthMismatch {
                declared: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut buf = encode_default(0x10, 0, &[1, 2, 3]);
        buf[HEADER_SIZE] = 9;
        let err = decode(&buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_decode_high_bit_flip_is_caught() {
        // Flipping only bit 7 leaves the masked checksum untouched.
        let mut buf = encode_default(0x10, 0, &[1, 2, 3]);
        buf[HEADER_SIZE + 1] |= 0x80;
        let err = decode(&buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidByte {
                offset: 9,
                byte: 0x82
            }
        ));
    }

    #[test]
    fn test_custom_markers() {
        let cfg = FrameConfig {
            start_marker: [0xF0, 0x00, 0x21, 0x1D],
            end_marker: 0xF7,
            max_frame_size: 64,
        };
        let mut buf = BytesMut::new();
        encode_frame(0x01, 3, &[2], &cfg, &mut buf).unwrap();

        assert_eq!(&buf[..4], &[0xF0, 0x00, 0x21, 0x1D]);
        assert!(decode(&buf, &cfg).is_ok());
        assert!(matches!(
            decode(&buf, &FrameConfig::default()),
            Err(FrameError::BadMarker)
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(FrameConfig::default().validate().is_ok());

        let low_marker = FrameConfig {
            start_marker: [0x10, 0, 0, 0],
            ..FrameConfig::default()
        };
        assert_eq!(
            low_marker.validate(),
            Err(FrameConfigError::MarkerNotReserved(0x10))
        );

        let collision = FrameConfig {
            end_marker: 0xF0,
            ..FrameConfig::default()
        };
        assert_eq!(
            collision.validate(),
            Err(FrameConfigError::MarkerCollision(0xF0))
        );

        let tiny = FrameConfig {
            max_frame_size: 4,
            ..FrameConfig::default()
        };
        assert!(matches!(
            tiny.validate(),
            Err(FrameConfigError::MaxFrameSizeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_encoder_sequence_wraps() {
        let mut encoder = FrameEncoder::default();
        for expected in 0..128u16 {
            let bytes = encoder.encode(0x50, &[]).unwrap();
            assert_eq!(bytes[5] as u16, expected);
        }
        let bytes = encoder.encode(0x50, &[]).unwrap();
        assert_eq!(bytes[5], 0);
    }

    #[test]
    fn test_encoder_rejection_keeps_sequence() {
        let mut encoder = FrameEncoder::default();
        encoder.encode(0x50, &[1]).unwrap();
        assert!(encoder.encode(0x50, &[200]).is_err());
        assert_eq!(encoder.next_sequence(), 1);
    }

    #[test]
    fn test_split_frames_from_stream() {
        let cfg = FrameConfig::default();
        let mut stream = BytesMut::new();
        stream.extend_from_slice(&[0x01, 0x02]);
        stream.extend_from_slice(&encode_default(0x10, 0, &[1]));
        stream.extend_from_slice(&encode_default(0x11, 1, &[2, 3]));

        let first = split_frame(&mut stream, &cfg).unwrap();
        assert_eq!(decode(&first, &cfg).unwrap().command, 0x10);
        let second = split_frame(&mut stream, &cfg).unwrap();
        assert_eq!(decode(&second, &cfg).unwrap().payload.as_ref(), &[2, 3]);
        assert!(split_frame(&mut stream, &cfg).is_none());
        assert!(stream.is_empty());
    }

    #[test]
    fn test_split_waits_for_end_marker() {
        let cfg = FrameConfig::default();
        let frame = encode_default(0x10, 0, &[1, 2, 3]);
        let mut stream = BytesMut::from(&frame[..6]);

        assert!(split_frame(&mut stream, &cfg).is_none());
        assert_eq!(stream.len(), 6);

        stream.extend_from_slice(&frame[6..]);
        assert_eq!(split_frame(&mut stream, &cfg).unwrap().as_ref(), frame.as_ref());
    }

    #[test]
    fn test_split_drops_interrupted_frame() {
        let cfg = FrameConfig::default();
        let frame = encode_default(0x22, 4, &[5]);
        let mut stream = BytesMut::new();
        stream.extend_from_slice(&frame[..7]);
        stream.extend_from_slice(&frame);

        let candidate = split_frame(&mut stream, &cfg).unwrap();
        assert_eq!(candidate.as_ref(), frame.as_ref());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0xF0, 0x7F, 0x00, 0x0A]), "F0 7F 00 0A");
        assert_eq!(hex_dump(&[]), "");
    }

    proptest! {
        #[test]
        fn roundtrip_any_valid_frame(
            command in 0u8..=0x7F,
            sequence in 0u8..=0x7F,
            payload in proptest::collection::vec(0u8..=0x7F, 0..200),
        ) {
            let cfg = FrameConfig::default();
            let mut buf = BytesMut::new();
            encode_frame(command, sequence, &payload, &cfg, &mut buf).unwrap();
            let frame = decode(&buf, &cfg).unwrap();
            prop_assert_eq!(frame.command, command);
            prop_assert_eq!(frame.sequence, sequence);
            prop_assert_eq!(frame.payload.as_ref(), payload.as_slice());
        }

        #[test]
        fn any_single_byte_corruption_is_detected(
            command in 0u8..=0x7F,
            payload in proptest::collection::vec(0u8..=0x7F, 0..64),
            index in any::<prop::sample::Index>(),
            mask in 1u8..=0xFF,
        ) {
            let cfg = FrameConfig::default();
            let mut buf = BytesMut::new();
            encode_frame(command, 0, &payload, &cfg, &mut buf).unwrap();
            let at = index.index(buf.len());
            buf[at] ^= mask;
            prop_assert!(decode(&buf, &cfg).is_err());
        }
    }
}
